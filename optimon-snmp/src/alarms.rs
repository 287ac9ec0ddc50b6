//! Alarm-table discovery: classify, decode, and deduplicate alarm rows.
//!
//! Optical devices raise one alarm row per wavelength channel, so a single
//! failed port surfaces as dozens of rows differing only in a trailing
//! 6-digit frequency-grid suffix. Discovery collapses those into one
//! instance per (base port, description) pair and counts the suppressed
//! channels.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use optimon_common::{Instance, collapse_whitespace, sanitize_instance_id};

use crate::classify::{Classifier, EntityType};
use crate::decode::{DecodeStrategy, DecodedEntity, PathTemplate, decode_entity};
use crate::error::SnmpError;
use crate::walker::{TableWalker, WalkValue, correlate};

/// One deduplicated alarm, built and discarded within a discovery pass.
#[derive(Debug, Clone)]
pub struct AlarmRecord {
    /// Index of the first row that produced this record.
    pub row_index: Vec<u32>,

    /// Entity path with any wavelength suffix removed.
    pub base_port: Option<String>,

    /// Entity path exactly as decoded.
    pub entity_name: Option<String>,

    pub entity_type: EntityType,
    pub description: String,

    /// How many later rows collapsed into this record.
    pub suppressed: u32,
}

impl AlarmRecord {
    /// Identity the record deduplicates and sorts under.
    fn key(&self) -> String {
        dedupe_key(self.base_port.as_deref(), self.entity_name.as_deref(), &self.description)
    }

    /// Human-readable display name, channel count appended when rows were
    /// suppressed.
    pub fn display_name(&self) -> String {
        let base = self
            .base_port
            .as_deref()
            .or(self.entity_name.as_deref())
            .unwrap_or("Unknown");

        let mut name = format!("{} - {}", base, self.description);
        if self.suppressed > 0 {
            name.push_str(&format!(" ({} channels)", self.suppressed + 1));
        }

        collapse_whitespace(&name)
    }

    /// Convert to a canonical discovery instance.
    ///
    /// The id derives from the dedupe key, so an unchanged device re-derives
    /// identical ids on every run.
    pub fn to_instance(&self) -> Instance {
        Instance::new(
            sanitize_instance_id(&self.key()),
            self.display_name(),
            collapse_whitespace(&self.description),
        )
        .with_property("auto.entity_type", self.entity_type.as_str())
        .with_property("auto.suppressed", self.suppressed.to_string())
    }
}

static WAVELENGTH_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{6}$").unwrap());

/// Strip one trailing `/dddddd` wavelength-channel suffix, if present.
///
/// Exactly six digits: shorter or longer numeric tails are real path
/// components and stay.
pub fn strip_wavelength_suffix(path: &str) -> &str {
    match WAVELENGTH_SUFFIX.find(path) {
        Some(m) => &path[..m.start()],
        None => path,
    }
}

fn dedupe_key(base_port: Option<&str>, entity_name: Option<&str>, description: &str) -> String {
    let base = base_port.or(entity_name).unwrap_or("unknown");
    format!("{}::{}", base, description)
}

/// Run one alarm discovery pass against a device.
///
/// Walks the entity-pointer and description branches, joins them by row
/// index, classifies and decodes each entity pointer, and deduplicates by
/// (base port, description). Returns records in first-seen order; callers
/// must not rely on that order, it is not part of the contract.
pub fn discover_alarms(
    walker: &mut dyn TableWalker,
    entity_branch: &[u32],
    description_branch: &[u32],
    classifier: &Classifier,
    templates: &HashMap<EntityType, PathTemplate>,
) -> Result<Vec<AlarmRecord>, SnmpError> {
    let entity_rows = walker.walk(entity_branch)?;
    let description_rows = walker.walk(description_branch)?;

    let mut records: Vec<AlarmRecord> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (index, entity_cell, description_cell) in correlate(&entity_rows, &description_rows) {
        let decoded = match entity_cell.and_then(WalkValue::as_oid) {
            Some(pointer) => {
                let class = classifier.classify(pointer);
                decode_entity(pointer, &class, templates)
            }
            // Missing or non-OID entity cell: the row survives, unidentified.
            None => DecodedEntity {
                path: None,
                entity_type: EntityType::Unknown,
                strategy: DecodeStrategy::None,
            },
        };

        let description = description_cell
            .and_then(WalkValue::as_text)
            .map(collapse_whitespace)
            .unwrap_or_default();

        let base_port = decoded
            .path
            .as_deref()
            .map(|p| strip_wavelength_suffix(p).to_string());

        let record = AlarmRecord {
            row_index: index,
            base_port,
            entity_name: decoded.path,
            entity_type: decoded.entity_type,
            description,
            suppressed: 0,
        };

        let key = record.key();
        match by_key.get(&key) {
            Some(&slot) => {
                // Duplicate channel: count it, emit nothing new.
                records[slot].suppressed += 1;
                tracing::debug!(key = %key, "Suppressed duplicate alarm row");
            }
            None => {
                by_key.insert(key, records.len());
                records.push(record);
            }
        }
    }

    Ok(records)
}
