//! SNMP alarm-table discovery collector.
//!
//! Walks two index-correlated branches of a device's alarm table (entity
//! pointers and descriptions), reverse-engineers entity identity from the
//! opaque pointer OIDs, collapses per-wavelength duplicate rows, and emits
//! one discovery line per distinct (port, alarm) pair.
//!
//! One process invocation handles one device for one poll cycle; nothing is
//! cached between runs.

pub mod alarms;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod oid;
pub mod walker;

use optimon_common::Instance;

use crate::alarms::discover_alarms;
use crate::config::SnmpCollectorConfig;
use crate::error::SnmpError;
use crate::oid::parse_oid;
use crate::walker::TableWalker;

/// Run one discovery pass and return the instances to publish.
///
/// Connectivity failures bubble up as fatal errors; an empty alarm table is
/// a normal, empty result.
pub fn run_discovery(
    config: &SnmpCollectorConfig,
    walker: &mut dyn TableWalker,
) -> Result<Vec<Instance>, SnmpError> {
    let entity_branch = parse_oid(&config.alarm.entity_branch)
        .map_err(|e| SnmpError::Config(e.to_string()))?;
    let description_branch = parse_oid(&config.alarm.description_branch)
        .map_err(|e| SnmpError::Config(e.to_string()))?;

    let classifier = classify::Classifier::new(config.compiled_rules()?);

    let records = discover_alarms(
        walker,
        &entity_branch,
        &description_branch,
        &classifier,
        &config.templates,
    )?;

    tracing::info!(
        alarms = records.len(),
        suppressed = records.iter().map(|r| r.suppressed).sum::<u32>(),
        "Alarm discovery pass complete"
    );

    Ok(records.iter().map(|r| r.to_instance()).collect())
}
