//! Instance discovery and metric extraction from a parsed NETCONF response.
//!
//! One filtered query per poll cycle fans out to every instance found in
//! the response. Interface-type rules drive both discovery and collection,
//! so the ids derived during collection always line up with the ids the
//! platform learned during discovery.

use roxmltree::{Document, Node};

use optimon_common::{Instance, MetricSample, sanitize_instance_id, sanitize_property_key};

use crate::config::{InterfaceRule, MetricRule, NetconfCollectorConfig};
use crate::xpath::{PathExpr, child_text, find_elements};

/// Timestamps the device reports before initialization; such values are
/// skipped without logging, they carry no information.
const UNSET_TIMESTAMP_PREFIX: &str = "0000-01-01";

/// Discover instances from a response document.
///
/// Zero instances is a valid outcome and distinct from failure: it clears
/// the device's instance list on the platform.
pub fn discover_instances(doc: &Document, config: &NetconfCollectorConfig) -> Vec<Instance> {
    let mut instances = Vec::new();

    for rule in &config.interfaces {
        let nodes = instance_nodes(doc, rule, config);
        tracing::debug!(
            interface_type = %rule.name,
            found = nodes.len(),
            "Interface search complete"
        );

        for node in nodes {
            let Some(raw_id) = resolve_identity(node, rule, config) else {
                continue;
            };

            let alias = rule
                .instance_name_key
                .as_deref()
                .and_then(|key| non_empty(child_text(node, key, &config.namespaces)))
                .unwrap_or_else(|| raw_id.clone());

            let description = rule
                .description_key
                .as_deref()
                .and_then(|key| non_empty(child_text(node, key, &config.namespaces)))
                .unwrap_or_default();

            let mut instance =
                Instance::new(sanitize_instance_id(&raw_id), alias, description);
            for key in &rule.properties {
                if let Some(value) = non_empty(child_text(node, key, &config.namespaces)) {
                    let prop = format!("auto.{}", sanitize_property_key(key));
                    instance = instance.with_property(prop, value);
                }
            }
            instance = instance.with_property("auto.interface_type", rule.name.clone());

            instances.push(instance);
        }
    }

    instances
}

/// Collect metrics for every discovered instance, plus chassis metrics.
pub fn collect_metrics(doc: &Document, config: &NetconfCollectorConfig) -> Vec<MetricSample> {
    let mut samples = Vec::new();

    for rule in &config.interfaces {
        for node in instance_nodes(doc, rule, config) {
            let Some(raw_id) = resolve_identity(node, rule, config) else {
                continue;
            };
            let instance_id = sanitize_instance_id(&raw_id);

            for metric in &rule.metrics {
                let Some(raw) = non_empty(child_text(node, &metric.path, &config.namespaces))
                else {
                    tracing::debug!(
                        instance = %instance_id,
                        metric = %metric.name,
                        "No value found"
                    );
                    continue;
                };

                if let Some(value) = transform_value(&raw, metric) {
                    samples.push(MetricSample::new(&instance_id, &metric.name, value));
                }
            }
        }
    }

    if let Some(chassis) = &config.chassis {
        let scope = chassis
            .path
            .as_deref()
            .map(|path| {
                find_elements(doc.root(), &PathExpr::parse(path), &config.namespaces)
                    .into_iter()
                    .next()
            })
            .unwrap_or_else(|| Some(doc.root()));

        if let Some(scope) = scope {
            for metric in &chassis.metrics {
                let found = find_elements(scope, &PathExpr::parse(&metric.path), &config.namespaces);
                let raw = found
                    .first()
                    .map(|n| n.text().unwrap_or_default().trim().to_string());

                if let Some(raw) = non_empty(raw) {
                    if let Some(value) = transform_value(&raw, metric) {
                        samples.push(MetricSample::device_level(&metric.name, value));
                    }
                }
            }
        }
    }

    samples
}

/// Find the instance nodes for one interface rule.
fn instance_nodes<'a, 'input>(
    doc: &'a Document<'input>,
    rule: &InterfaceRule,
    config: &NetconfCollectorConfig,
) -> Vec<Node<'a, 'input>> {
    find_elements(doc.root(), &PathExpr::parse(&rule.path), &config.namespaces)
}

/// Resolve the identity of one candidate node.
///
/// Primary key text wins; the fallback key covers devices that omit the
/// alias. A node with neither is excluded from output entirely, which is
/// worth a warning but never fatal.
fn resolve_identity(
    node: Node,
    rule: &InterfaceRule,
    config: &NetconfCollectorConfig,
) -> Option<String> {
    let primary = non_empty(child_text(node, &rule.instance_key, &config.namespaces));
    if primary.is_some() {
        return primary;
    }

    let fallback = rule
        .fallback_id_key
        .as_deref()
        .and_then(|key| non_empty(child_text(node, key, &config.namespaces)));
    if fallback.is_some() {
        return fallback;
    }

    tracing::warn!(
        interface_type = %rule.name,
        "No instance identity found for element, skipping"
    );
    None
}

/// Transform a raw element text into a numeric metric value.
///
/// Order: string map, then timestamp parse, then direct float coercion.
/// Returns None when the value must be skipped; the caller emits nothing
/// for it.
pub fn transform_value(raw: &str, rule: &MetricRule) -> Option<f64> {
    let raw = raw.trim();

    if let Some(map) = &rule.string_map {
        if let Some(value) = map.get(raw) {
            return Some(*value);
        }
        // A mapped metric with an unrecognized state word reports 0.
        tracing::debug!(metric = %rule.name, value = %raw, "State word not in map, using 0");
        return Some(0.0);
    }

    if rule.parse_timestamp {
        return parse_timestamp_value(raw);
    }

    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(metric = %rule.name, value = %raw, "Value is not numeric, skipping");
            None
        }
    }
}

/// Parse a timestamp into epoch seconds.
///
/// The reserved "unset" sentinel is skipped silently: it marks a value the
/// device never initialized, not an anomaly worth reporting.
fn parse_timestamp_value(raw: &str) -> Option<f64> {
    if raw.starts_with(UNSET_TIMESTAMP_PREFIX) {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp() as f64);
    }

    const FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().timestamp() as f64);
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Some(midnight.and_utc().timestamp() as f64);
        }
    }

    tracing::debug!(value = %raw, "Failed to parse timestamp, skipping");
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
