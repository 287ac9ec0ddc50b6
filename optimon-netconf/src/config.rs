use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use optimon_common::LoggingConfig;

use crate::error::NetconfError;

/// Root configuration for the NETCONF collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetconfCollectorConfig {
    /// Device endpoint and credentials.
    pub device: DeviceConfig,

    /// Raw subtree filter sent with the single per-cycle query.
    /// Configuration data for the device family, not branching logic.
    pub filter: String,

    /// Namespace prefix -> URI map used by the primary query tier.
    #[serde(default)]
    pub namespaces: HashMap<String, String>,

    /// Interface-type rules, evaluated in order.
    #[serde(default)]
    pub interfaces: Vec<InterfaceRule>,

    /// Optional device-level metrics (single-instance output).
    #[serde(default)]
    pub chassis: Option<ChassisRule>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device hostname or IP.
    pub host: String,

    /// NETCONF port.
    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,
    pub password: String,

    /// Timeout applied to connect and each channel operation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    830
}

fn default_timeout_secs() -> u64 {
    60
}

/// Extraction rule for one interface type (OTS, OSC, PTP, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceRule {
    /// Interface type name; also published as `auto.interface_type`.
    pub name: String,

    /// Element path selecting one node per instance. Segments may carry
    /// namespace prefixes resolved against the `namespaces` map.
    pub path: String,

    /// Child element whose text is the primary instance identity.
    pub instance_key: String,

    /// Fallback identity element when the primary is empty or absent.
    #[serde(default)]
    pub fallback_id_key: Option<String>,

    /// Child element used for the display name (defaults to the identity).
    #[serde(default)]
    pub instance_name_key: Option<String>,

    /// Child element used for the description.
    #[serde(default)]
    pub description_key: Option<String>,

    /// Child elements published as `auto.*` properties.
    #[serde(default)]
    pub properties: Vec<String>,

    /// Metrics collected per instance.
    #[serde(default)]
    pub metrics: Vec<MetricRule>,
}

/// One metric extracted relative to an instance node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRule {
    /// Datapoint name in the collection output.
    pub name: String,

    /// Element path relative to the instance node.
    pub path: String,

    /// Optional state-word to number mapping (e.g. {"up": 1, "down": 0}).
    /// A word missing from the map collects as 0.
    #[serde(default)]
    pub string_map: Option<HashMap<String, f64>>,

    /// Parse the raw text as a timestamp and collect epoch seconds.
    #[serde(default)]
    pub parse_timestamp: bool,
}

/// Device-level metrics collected without instance prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChassisRule {
    /// Optional element path scoping the chassis subtree; the whole
    /// response is searched when absent.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub metrics: Vec<MetricRule>,
}

impl NetconfCollectorConfig {
    /// Load configuration from a JSON5 file.
    pub fn load(path: impl AsRef<Path>) -> optimon_common::Result<Self> {
        optimon_common::load_config(path)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> optimon_common::Result<Self> {
        optimon_common::parse_config(content)
    }

    /// Validate the loaded configuration.
    pub fn validate(&self) -> Result<(), NetconfError> {
        if self.device.host.is_empty() {
            return Err(NetconfError::Config("Device host cannot be empty".into()));
        }
        if self.filter.trim().is_empty() {
            return Err(NetconfError::Config(
                "No subtree filter defined in configuration".into(),
            ));
        }

        for rule in &self.interfaces {
            if rule.name.is_empty() || rule.path.is_empty() {
                return Err(NetconfError::Config(format!(
                    "Interface rule '{}' needs both a name and a path",
                    rule.name
                )));
            }
            if rule.instance_key.is_empty() {
                return Err(NetconfError::Config(format!(
                    "Interface rule '{}' has no instance key",
                    rule.name
                )));
            }
            for metric in &rule.metrics {
                if metric.name.is_empty() || metric.path.is_empty() {
                    return Err(NetconfError::Config(format!(
                        "Interface rule '{}' has a metric without name or path",
                        rule.name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json5 = r#"
        {
            device: {
                host: "ws1.example.net",
                username: "monitor",
                password: "secret",
            },
            filter: "<waveserver-ports xmlns='urn:ciena:params:xml:ns:yang:ciena-ws-port'/>",
            namespaces: {
                "ws-port": "urn:ciena:params:xml:ns:yang:ciena-ws-port",
            },
            interfaces: [
                {
                    name: "port",
                    path: "ws-port:waveserver-ports/ws-port:ports",
                    instance_key: "alias-name",
                    fallback_id_key: "port-name",
                    description_key: "label",
                    properties: ["type"],
                    metrics: [
                        { name: "rx_power", path: "rx-power" },
                        {
                            name: "oper_state",
                            path: "operational-state",
                            string_map: { "up": 1, "down": 0 },
                        },
                    ],
                },
            ],
        }
        "#;

        let config = NetconfCollectorConfig::parse(json5).unwrap();
        config.validate().unwrap();

        assert_eq!(config.device.port, 830);
        assert_eq!(config.device.timeout_secs, 60);
        assert_eq!(config.interfaces.len(), 1);

        let rule = &config.interfaces[0];
        assert_eq!(rule.name, "port");
        assert_eq!(rule.fallback_id_key.as_deref(), Some("port-name"));
        assert_eq!(rule.metrics.len(), 2);
        assert_eq!(
            rule.metrics[1].string_map.as_ref().unwrap().get("up"),
            Some(&1.0)
        );
    }

    #[test]
    fn test_validate_requires_filter() {
        let json5 = r#"
        {
            device: { host: "h", username: "u", password: "p" },
            filter: "  ",
        }
        "#;

        let config = NetconfCollectorConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_instance_key() {
        let json5 = r#"
        {
            device: { host: "h", username: "u", password: "p" },
            filter: "<x/>",
            interfaces: [
                { name: "ots", path: "a/b", instance_key: "" },
            ],
        }
        "#;

        let config = NetconfCollectorConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chassis_rule_optional() {
        let json5 = r#"
        {
            device: { host: "h", username: "u", password: "p" },
            filter: "<x/>",
            chassis: {
                metrics: [
                    { name: "ne_temperature", path: "temperature" },
                ],
            },
        }
        "#;

        let config = NetconfCollectorConfig::parse(json5).unwrap();
        let chassis = config.chassis.unwrap();
        assert_eq!(chassis.metrics.len(), 1);
        assert!(chassis.path.is_none());
    }
}
