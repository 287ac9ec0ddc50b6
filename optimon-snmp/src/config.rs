use std::collections::HashMap;
use std::path::Path;

use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

use optimon_common::LoggingConfig;

use crate::classify::{ClassifyRule, EntityType};
use crate::decode::PathTemplate;
use crate::error::SnmpError;
use crate::oid::parse_oid;

/// Root configuration for the SNMP alarm collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpCollectorConfig {
    /// Device to poll.
    pub device: DeviceConfig,

    /// Alarm table branch OIDs.
    pub alarm: AlarmTableConfig,

    /// Ordered entity classification rules (registration order breaks
    /// longest-prefix ties).
    #[serde(default)]
    pub rules: Vec<ClassifyRuleConfig>,

    /// Positional decode template per entity type.
    #[serde(default, deserialize_with = "deserialize_templates")]
    pub templates: HashMap<EntityType, PathTemplate>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deserialize the entity-type-keyed template map.
///
/// The json5 backend cannot deserialize a map whose keys are enums, so the
/// keys are read as strings and then converted through `EntityType`'s own
/// `Deserialize` impl — preserving the exact set of accepted spellings and
/// the error raised on an unknown key.
fn deserialize_templates<'de, D>(
    deserializer: D,
) -> Result<HashMap<EntityType, PathTemplate>, D::Error>
where
    D: Deserializer<'de>,
{
    let string_keyed: HashMap<String, PathTemplate> = HashMap::deserialize(deserializer)?;
    string_keyed
        .into_iter()
        .map(|(key, value)| {
            let entity_type = EntityType::deserialize(key.into_deserializer())?;
            Ok((entity_type, value))
        })
        .collect()
}

/// Configuration for the polled device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device address (e.g., "192.168.1.1:161").
    pub address: String,

    /// SNMP community string.
    #[serde(default = "default_community")]
    pub community: String,

    /// SNMP version ("v1" or "v2c").
    #[serde(default)]
    pub version: SnmpVersion,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_community() -> String {
    "public".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

/// SNMP protocol version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpVersion {
    #[serde(rename = "v1")]
    V1,
    #[default]
    #[serde(rename = "v2c")]
    V2c,
}

/// The two index-correlated branches of the alarm table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmTableConfig {
    /// Branch whose cells point at the alarmed entity.
    pub entity_branch: String,

    /// Branch whose cells carry the alarm description.
    pub description_branch: String,
}

/// One classification rule as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRuleConfig {
    /// Dotted OID prefix the entity pointer must start with.
    pub prefix: String,

    /// Entity type assigned on match.
    pub entity_type: EntityType,

    /// Number of index components consumed by the prefix.
    pub index_prefix_len: usize,
}

impl ClassifyRuleConfig {
    /// Compile into the numeric form used by the classifier.
    pub fn compile(&self) -> Result<ClassifyRule, SnmpError> {
        let prefix = parse_oid(&self.prefix)
            .map_err(|e| SnmpError::Config(format!("Bad rule prefix '{}': {}", self.prefix, e)))?;

        Ok(ClassifyRule {
            prefix,
            entity_type: self.entity_type,
            index_prefix_len: self.index_prefix_len,
        })
    }
}

impl SnmpCollectorConfig {
    /// Load configuration from a JSON5 file.
    pub fn load(path: impl AsRef<Path>) -> optimon_common::Result<Self> {
        optimon_common::load_config(path)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> optimon_common::Result<Self> {
        optimon_common::parse_config(content)
    }

    /// Validate the loaded configuration.
    pub fn validate(&self) -> Result<(), SnmpError> {
        if self.device.address.is_empty() {
            return Err(SnmpError::Config("Device address cannot be empty".into()));
        }

        parse_oid(&self.alarm.entity_branch).map_err(|e| {
            SnmpError::Config(format!(
                "Bad entity branch '{}': {}",
                self.alarm.entity_branch, e
            ))
        })?;
        parse_oid(&self.alarm.description_branch).map_err(|e| {
            SnmpError::Config(format!(
                "Bad description branch '{}': {}",
                self.alarm.description_branch, e
            ))
        })?;

        for rule in &self.rules {
            rule.compile()?;
        }

        Ok(())
    }

    /// Compile the classification rules, preserving registration order.
    pub fn compiled_rules(&self) -> Result<Vec<ClassifyRule>, SnmpError> {
        self.rules.iter().map(|r| r.compile()).collect()
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
                address: "192.168.1.1:161",
                community: "public",
                version: "v2c",
                timeout_secs: 5,
            },
            alarm: {
                entity_branch: "1.3.6.1.4.1.42229.1.2.3.1.2",
                description_branch: "1.3.6.1.4.1.42229.1.2.3.1.7",
            },
            rules: [
                { prefix: "1.3.6.1.4.1.42229.6.2", entity_type: "pluggable", index_prefix_len: 11 },
                { prefix: "1.3.6.1.4.1.42229", entity_type: "chassis", index_prefix_len: 7 },
            ],
            templates: {
                pluggable: "port",
                card: "card",
            },
            logging: { level: "info" },
        }
        "#;

        let config = SnmpCollectorConfig::parse(json5).unwrap();
        config.validate().unwrap();

        assert_eq!(config.device.address, "192.168.1.1:161");
        assert_eq!(config.device.version, SnmpVersion::V2c);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].entity_type, EntityType::Pluggable);
        assert_eq!(
            config.templates.get(&EntityType::Pluggable),
            Some(&PathTemplate::Port)
        );
    }

    #[test]
    fn test_defaults() {
        let json5 = r#"
        {
            device: { address: "10.0.0.1:161" },
            alarm: {
                entity_branch: "1.3.6.1.4.1.42229.1.2.3.1.2",
                description_branch: "1.3.6.1.4.1.42229.1.2.3.1.7",
            },
        }
        "#;

        let config = SnmpCollectorConfig::parse(json5).unwrap();
        assert_eq!(config.device.community, "public");
        assert_eq!(config.device.version, SnmpVersion::V2c);
        assert_eq!(config.device.timeout_secs, 5);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_branch() {
        let json5 = r#"
        {
            device: { address: "10.0.0.1:161" },
            alarm: {
                entity_branch: "not-an-oid",
                description_branch: "1.3.6.1.4.1.42229.1.2.3.1.7",
            },
        }
        "#;

        let config = SnmpCollectorConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_address() {
        let json5 = r#"
        {
            device: { address: "" },
            alarm: {
                entity_branch: "1.3.6.1.4.1.42229.1.2.3.1.2",
                description_branch: "1.3.6.1.4.1.42229.1.2.3.1.7",
            },
        }
        "#;

        let config = SnmpCollectorConfig::parse(json5).unwrap();
        assert!(config.validate().is_err());
    }
}
