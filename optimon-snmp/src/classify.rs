//! Entity type classification for opaque entity-pointer values.
//!
//! Alarm table rows carry an OID pointing into the device's physical entity
//! tree. There is no authoritative schema for that tree, so classification
//! works off an ordered rule table supplied by configuration: each rule maps
//! an OID prefix to an entity type and the number of index components the
//! prefix consumes.

use serde::{Deserialize, Serialize};

use crate::oid::oid_starts_with;

/// Kind of physical entity an alarm points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Physical port (client or line side).
    Port,
    /// Line card / module slot.
    Card,
    /// Pluggable transceiver.
    Pluggable,
    /// Whole shelf or chassis.
    Chassis,
    /// No rule matched.
    Unknown,
}

impl EntityType {
    /// Lowercase name, matching the configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Port => "port",
            Self::Card => "card",
            Self::Pluggable => "pluggable",
            Self::Chassis => "chassis",
            Self::Unknown => "unknown",
        }
    }
}

/// One classification rule: an OID prefix, the entity type it denotes, and
/// how many leading index components belong to the prefix.
#[derive(Debug, Clone)]
pub struct ClassifyRule {
    pub prefix: Vec<u32>,
    pub entity_type: EntityType,
    pub index_prefix_len: usize,
}

/// Result of classifying an entity-pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub entity_type: EntityType,
    pub index_prefix_len: usize,
}

impl Classification {
    /// The classification returned when no rule matches.
    pub fn unknown() -> Self {
        Self {
            entity_type: EntityType::Unknown,
            index_prefix_len: 0,
        }
    }
}

/// Longest-prefix rule matcher over an ordered rule table.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: Vec<ClassifyRule>,
}

impl Classifier {
    /// Build a classifier from rules in registration order.
    pub fn new(rules: Vec<ClassifyRule>) -> Self {
        Self { rules }
    }

    /// Classify an entity-pointer value.
    ///
    /// The rule with the longest matching prefix wins; equal-length matches
    /// resolve to the earliest registered rule. Total: unmatched values
    /// classify as `(Unknown, 0)`.
    pub fn classify(&self, value: &[u32]) -> Classification {
        let mut best: Option<&ClassifyRule> = None;

        for rule in &self.rules {
            if !oid_starts_with(value, &rule.prefix) {
                continue;
            }
            // Strictly-longer wins; ties keep the earlier registration.
            match best {
                Some(current) if rule.prefix.len() <= current.prefix.len() => {}
                _ => best = Some(rule),
            }
        }

        match best {
            Some(rule) => Classification {
                entity_type: rule.entity_type,
                index_prefix_len: rule.index_prefix_len,
            },
            None => Classification::unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::parse_oid;

    fn rule(prefix: &str, entity_type: EntityType, index_prefix_len: usize) -> ClassifyRule {
        ClassifyRule {
            prefix: parse_oid(prefix).unwrap(),
            entity_type,
            index_prefix_len,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let classifier = Classifier::new(vec![
            rule("1.3.6.1.4.1.42229", EntityType::Chassis, 7),
            rule("1.3.6.1.4.1.42229.6.2", EntityType::Pluggable, 11),
        ]);

        let value = parse_oid("1.3.6.1.4.1.42229.6.2.5.1.2.3.1.1.0.10").unwrap();
        let class = classifier.classify(&value);
        assert_eq!(class.entity_type, EntityType::Pluggable);
        assert_eq!(class.index_prefix_len, 11);
    }

    #[test]
    fn test_tie_resolves_to_registration_order() {
        // Two rules with equal-length matching prefixes: the one registered
        // first wins, regardless of how the table is stored.
        let classifier = Classifier::new(vec![
            rule("1.3.6.1.4.1.42229.6", EntityType::Port, 8),
            rule("1.3.6.1.4.1.42229.6", EntityType::Card, 8),
        ]);

        let value = parse_oid("1.3.6.1.4.1.42229.6.1.2").unwrap();
        assert_eq!(classifier.classify(&value).entity_type, EntityType::Port);
    }

    #[test]
    fn test_no_match_is_unknown() {
        let classifier = Classifier::new(vec![rule("1.3.6.1.4.1.42229", EntityType::Port, 7)]);

        let value = parse_oid("1.3.6.1.2.1.1.1.0").unwrap();
        let class = classifier.classify(&value);
        assert_eq!(class.entity_type, EntityType::Unknown);
        assert_eq!(class.index_prefix_len, 0);
    }

    #[test]
    fn test_empty_ruleset_is_total() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(&[1, 2, 3]), Classification::unknown());
    }

    #[test]
    fn test_general_and_specific_overlap() {
        let classifier = Classifier::new(vec![
            rule("1.3.6.1.4.1.42229.6.2", EntityType::Pluggable, 11),
            rule("1.3.6.1.4.1.42229", EntityType::Chassis, 7),
        ]);

        // Matches both rules; the more specific prefix classifies it.
        let specific = parse_oid("1.3.6.1.4.1.42229.6.2.1").unwrap();
        assert_eq!(
            classifier.classify(&specific).entity_type,
            EntityType::Pluggable
        );

        // Matches only the general rule.
        let general = parse_oid("1.3.6.1.4.1.42229.9.1").unwrap();
        assert_eq!(
            classifier.classify(&general).entity_type,
            EntityType::Chassis
        );
    }
}
