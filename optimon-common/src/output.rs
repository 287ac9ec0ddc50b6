//! Canonical instance/metric records and the two line formats consumed by
//! the monitoring platform.
//!
//! Discovery format (one line per instance):
//!
//! ```text
//! id##alias##description####k1=v1&k2=v2
//! ```
//!
//! The `####properties` tail is omitted for instances without properties.
//! Property values are rendered verbatim: literal `&`, `=` or `#` inside
//! content corrupts the line. This is a documented limitation of the
//! platform format, not something the encoder repairs.
//!
//! Collection format (one line per sample):
//!
//! ```text
//! instanceId.metricName=value     // batch samples
//! metricName=value                // device-level (chassis) samples
//! ```

use std::io::Write;

use once_cell::sync::Lazy;
use regex::Regex;

/// One monitored sub-entity of a device, keyed by a stable derived id.
///
/// Re-running discovery against an unchanged device must produce identical
/// ids, so ids are always derived from device data, never generated.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Unique instance id (sanitized, stable across polling cycles).
    pub id: String,

    /// Human-readable display name.
    pub alias: String,

    /// Optional free-form description.
    pub description: String,

    /// Properties in insertion order.
    pub properties: Vec<(String, String)>,
}

impl Instance {
    /// Create an instance with no properties.
    pub fn new(
        id: impl Into<String>,
        alias: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            description: description.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property, preserving insertion order.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }
}

/// A single collected metric value.
///
/// `instance_id` is `None` for device-level samples, which are emitted in
/// the single-instance format without an instance prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub instance_id: Option<String>,
    pub name: String,
    pub value: f64,
}

impl MetricSample {
    /// Create a batch sample bound to an instance.
    pub fn new(instance_id: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            instance_id: Some(instance_id.into()),
            name: name.into(),
            value,
        }
    }

    /// Create a device-level sample with no instance prefix.
    pub fn device_level(name: impl Into<String>, value: f64) -> Self {
        Self {
            instance_id: None,
            name: name.into(),
            value,
        }
    }
}

/// Format a single discovery line.
pub fn format_discovery_line(instance: &Instance) -> String {
    let mut line = format!(
        "{}##{}##{}",
        instance.id, instance.alias, instance.description
    );

    if !instance.properties.is_empty() {
        let props = instance
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        line.push_str("####");
        line.push_str(&props);
    }

    line
}

/// Format a single collection line.
pub fn format_collection_line(sample: &MetricSample) -> String {
    match &sample.instance_id {
        Some(id) => format!("{}.{}={}", id, sample.name, sample.value),
        None => format!("{}={}", sample.name, sample.value),
    }
}

/// Write discovery output, one line per instance.
pub fn write_discovery<W: Write>(out: &mut W, instances: &[Instance]) -> std::io::Result<()> {
    for instance in instances {
        writeln!(out, "{}", format_discovery_line(instance))?;
    }
    out.flush()
}

/// Write collection output, one line per sample.
pub fn write_collection<W: Write>(out: &mut W, samples: &[MetricSample]) -> std::io::Result<()> {
    for sample in samples {
        writeln!(out, "{}", format_collection_line(sample))?;
    }
    out.flush()
}

static INVALID_ID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:#\\\s]").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Sanitize a raw value for use as an instance id.
///
/// The platform rejects ids containing `:`, `#`, `\` or whitespace; those
/// are replaced with underscores, runs collapsed, ends trimmed.
pub fn sanitize_instance_id(value: &str) -> String {
    let replaced = INVALID_ID_CHARS.replace_all(value, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Sanitize an element or attribute name for use as a property key.
///
/// Lowercases and reduces to `[a-z0-9_]`, collapsing runs.
pub fn sanitize_property_key(name: &str) -> String {
    let lower = name.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lower, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUNS.replace_all(value.trim(), " ").to_string()
}
