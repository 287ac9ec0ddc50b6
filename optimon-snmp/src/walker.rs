//! Table walk abstraction over index-correlated device table branches.
//!
//! A walk enumerates every row beneath one OID branch and keys it by the
//! row's index (the OID components past the branch). Branches of the same
//! table share indices, so two walks can be correlated row-by-row.

use std::collections::BTreeMap;
use std::time::Duration;

use snmp2::{Oid, SyncSession, Value};

use crate::config::{DeviceConfig, SnmpVersion};
use crate::error::SnmpError;
use crate::oid::{oid_starts_with, oid_to_string, parse_oid};

/// Raw value of one walked table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkValue {
    /// An OID-valued cell (entity pointers).
    Oid(Vec<u32>),
    /// A textual cell (descriptions, names).
    Text(String),
    /// An integer cell.
    Int(i64),
}

impl WalkValue {
    pub fn as_oid(&self) -> Option<&[u32]> {
        match self {
            Self::Oid(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Rows of one walked branch, ordered by index.
pub type WalkRows = BTreeMap<Vec<u32>, WalkValue>;

/// Enumerates the rows beneath one OID branch.
///
/// Implementations must return an empty map for an empty branch; "nothing
/// there" is a normal result, not an error.
pub trait TableWalker {
    fn walk(&mut self, branch: &[u32]) -> Result<WalkRows, SnmpError>;
}

/// Join two index-correlated branches by exact index equality.
///
/// Produces the union of indices in index order. A row present in only one
/// branch keeps `None` for the other side: missing data for that field, not
/// an error.
pub fn correlate<'a>(
    left: &'a WalkRows,
    right: &'a WalkRows,
) -> Vec<(Vec<u32>, Option<&'a WalkValue>, Option<&'a WalkValue>)> {
    let mut indices: BTreeMap<&Vec<u32>, ()> = BTreeMap::new();
    for index in left.keys() {
        indices.insert(index, ());
    }
    for index in right.keys() {
        indices.insert(index, ());
    }

    indices
        .into_keys()
        .map(|index| (index.clone(), left.get(index), right.get(index)))
        .collect()
}

/// Walker backed by a live SNMP session (GETNEXT loop).
///
/// A fresh session is created per walk; the engine is batch-per-invocation
/// and keeps no connection state between branches.
pub struct SnmpWalker {
    device: DeviceConfig,
    request_timeout: Duration,
}

impl SnmpWalker {
    pub fn new(device: DeviceConfig) -> Self {
        let request_timeout = Duration::from_secs(device.timeout_secs);
        Self {
            device,
            request_timeout,
        }
    }

    fn create_session(&self) -> Result<SyncSession, SnmpError> {
        let community = self.device.community.as_bytes();

        let session = match self.device.version {
            SnmpVersion::V1 => SyncSession::new_v1(
                self.device.address.as_str(),
                community,
                Some(self.request_timeout),
                0,
            ),
            SnmpVersion::V2c => SyncSession::new_v2c(
                self.device.address.as_str(),
                community,
                Some(self.request_timeout),
                0,
            ),
        };

        session.map_err(|e| {
            SnmpError::Connection(format!(
                "Failed to create SNMP session to {}: {:?}",
                self.device.address, e
            ))
        })
    }
}

impl TableWalker for SnmpWalker {
    fn walk(&mut self, branch: &[u32]) -> Result<WalkRows, SnmpError> {
        let branch_str = oid_to_string(branch);
        let subtree: Oid = branch_str
            .parse()
            .map_err(|e| SnmpError::Protocol(format!("Invalid branch OID '{branch_str}': {e:?}")))?;

        let mut session = self.create_session()?;
        let mut rows = WalkRows::new();
        let mut current = subtree.to_owned();

        loop {
            let response = session.getnext(&current).map_err(|e| {
                SnmpError::Connection(format!(
                    "SNMP GETNEXT failed on {} at {}: {:?}",
                    self.device.address,
                    current.to_id_string(),
                    e
                ))
            })?;

            let Some((resp_oid, value)) = response.varbinds.into_iter().next() else {
                break;
            };

            let resp_components = parse_oid(&resp_oid.to_id_string())
                .map_err(|e| SnmpError::Protocol(format!("Unparseable response OID: {e}")))?;

            // Left the subtree: the walk is complete.
            if !oid_starts_with(&resp_components, branch) {
                break;
            }

            if matches!(value, Value::EndOfMibView) {
                break;
            }

            let index = resp_components[branch.len()..].to_vec();
            if let Some(walked) = snmp_value_to_walk_value(&value) {
                rows.insert(index, walked);
            }

            current = resp_oid.to_owned();
        }

        tracing::debug!(
            device = %self.device.address,
            branch = %branch_str,
            rows = rows.len(),
            "Table walk complete"
        );

        Ok(rows)
    }
}

/// Convert an SNMP value to a walk value.
///
/// Exception values (noSuchObject etc.) map to None and the row is skipped.
fn snmp_value_to_walk_value(value: &Value) -> Option<WalkValue> {
    match value {
        Value::Integer(n) => Some(WalkValue::Int(*n)),
        Value::OctetString(bytes) => Some(WalkValue::Text(
            String::from_utf8_lossy(bytes).trim().to_string(),
        )),
        Value::ObjectIdentifier(oid) => parse_oid(&oid.to_id_string()).ok().map(WalkValue::Oid),
        Value::Counter32(n) => Some(WalkValue::Int(*n as i64)),
        Value::Unsigned32(n) => Some(WalkValue::Int(*n as i64)),
        Value::Timeticks(n) => Some(WalkValue::Int(*n as i64)),
        Value::Counter64(n) => Some(WalkValue::Int(*n as i64)),
        Value::IpAddress(ip) => Some(WalkValue::Text(format!(
            "{}.{}.{}.{}",
            ip[0], ip[1], ip[2], ip[3]
        ))),
        _ => None,
    }
}

/// In-memory walker for tests and offline replay.
///
/// Holds a flat OID→value table; a walk selects the rows under the branch
/// and re-keys them by index.
#[derive(Debug, Default)]
pub struct MemoryWalker {
    table: BTreeMap<Vec<u32>, WalkValue>,
}

impl MemoryWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell at a full OID (branch + index).
    pub fn insert(&mut self, oid: Vec<u32>, value: WalkValue) {
        self.table.insert(oid, value);
    }
}

impl TableWalker for MemoryWalker {
    fn walk(&mut self, branch: &[u32]) -> Result<WalkRows, SnmpError> {
        let mut rows = WalkRows::new();
        for (oid, value) in &self.table {
            if oid_starts_with(oid, branch) && oid.len() > branch.len() {
                rows.insert(oid[branch.len()..].to_vec(), value.clone());
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(entries: &[(&[u32], WalkValue)]) -> WalkRows {
        entries
            .iter()
            .map(|(idx, v)| (idx.to_vec(), v.clone()))
            .collect()
    }

    #[test]
    fn test_correlate_joins_on_equal_index() {
        let left = rows(&[
            (&[1], WalkValue::Int(10)),
            (&[2], WalkValue::Int(20)),
        ]);
        let right = rows(&[
            (&[1], WalkValue::Text("a".into())),
            (&[2], WalkValue::Text("b".into())),
        ]);

        let joined = correlate(&left, &right);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].0, vec![1]);
        assert_eq!(joined[0].1, Some(&WalkValue::Int(10)));
        assert_eq!(joined[0].2, Some(&WalkValue::Text("a".into())));
    }

    #[test]
    fn test_correlate_one_sided_rows_are_missing_data() {
        let left = rows(&[(&[1], WalkValue::Int(10))]);
        let right = rows(&[(&[2], WalkValue::Text("b".into()))]);

        let joined = correlate(&left, &right);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0], (vec![1], Some(&WalkValue::Int(10)), None));
        assert_eq!(joined[1], (vec![2], None, Some(&WalkValue::Text("b".into()))));
    }

    #[test]
    fn test_memory_walker_selects_branch() {
        let mut walker = MemoryWalker::new();
        walker.insert(vec![1, 3, 6, 1, 1], WalkValue::Int(1));
        walker.insert(vec![1, 3, 6, 2, 7], WalkValue::Int(2));

        let rows = walker.walk(&[1, 3, 6, 1]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.get(&vec![1]), Some(&WalkValue::Int(1)));
    }

    #[test]
    fn test_memory_walker_empty_branch_is_ok() {
        let mut walker = MemoryWalker::new();
        let rows = walker.walk(&[9, 9, 9]).unwrap();
        assert!(rows.is_empty());
    }
}
