//! Dual-strategy decoding of entity indices into human-readable paths.
//!
//! Devices encode entity identity into the numeric tail of an entity-pointer
//! OID in two observed ways:
//!
//! 1. An embedded length-prefixed ASCII string (e.g. the port path
//!    `"1/3.1/1"` appears as `7.49.47.51.46.49.47.49`), or
//! 2. A positional numeric layout where shelf/slot/port live at fixed
//!    offsets past the classified prefix.
//!
//! Strategies are tried in that fixed order; the first success wins. When
//! both fail the row is still usable, it just lands in the "unknown" bucket.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classify::{Classification, EntityType};

/// Which strategy produced a decoded path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Ascii,
    Numeric,
    None,
}

/// Decoded identity of one table row.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    /// Human-readable entity path, or None when neither strategy applied.
    pub path: Option<String>,
    pub entity_type: EntityType,
    pub strategy: DecodeStrategy,
}

/// Positional layout applied to the numeric remainder of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathTemplate {
    /// Port-like: 4-element remainder rendered as `a/b/d`, the third
    /// (sub-slot) element dropped.
    Port,
    /// Card-like: 3-element remainder rendered as `a/b.c`.
    Card,
    /// Generic: `a/b` for 2 elements, `a/b/c` for 3 or more.
    #[default]
    Generic,
}

/// Decode an entity-pointer value using its classification.
///
/// Tries the ASCII-run decode first, then the positional-numeric decode.
/// Total: failure of both yields `path: None` rather than an error.
pub fn decode_entity(
    value: &[u32],
    class: &Classification,
    templates: &HashMap<EntityType, PathTemplate>,
) -> DecodedEntity {
    if let Some(path) = ascii_decode(value) {
        return DecodedEntity {
            path: Some(path),
            entity_type: class.entity_type,
            strategy: DecodeStrategy::Ascii,
        };
    }

    if let Some(path) = numeric_decode(value, class, templates) {
        return DecodedEntity {
            path: Some(path),
            entity_type: class.entity_type,
            strategy: DecodeStrategy::Numeric,
        };
    }

    DecodedEntity {
        path: None,
        entity_type: class.entity_type,
        strategy: DecodeStrategy::None,
    }
}

/// Minimum embedded-string length accepted by the ASCII-run scan.
///
/// Shorter runs are overwhelmingly coincidental: almost any small integer
/// followed by that many mid-range values "decodes".
const MIN_ASCII_RUN: usize = 3;

const PRINTABLE: std::ops::RangeInclusive<u32> = 32..=126;

/// Scan an integer sequence for embedded length-prefixed ASCII strings.
///
/// Every position is treated as a possible length marker, so unrelated
/// numeric fields that happen to look like valid lengths still let a later,
/// real run be found. All candidates are collected; selection happens in
/// [`select_candidate`].
fn ascii_candidates(seq: &[u32]) -> Vec<String> {
    let mut candidates = Vec::new();

    for (i, &len) in seq.iter().enumerate() {
        let len = len as usize;
        if len < MIN_ASCII_RUN || i + 1 + len > seq.len() {
            continue;
        }

        let run = &seq[i + 1..i + 1 + len];
        if run.iter().all(|c| PRINTABLE.contains(c)) {
            candidates.push(run.iter().map(|&c| c as u8 as char).collect());
        }
    }

    candidates
}

/// Pick the most plausible candidate string.
///
/// Priority: entity paths (contain `/`), then dotted-quad IP addresses,
/// then simply the longest run. Ties keep the earliest candidate.
fn select_candidate(candidates: Vec<String>) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let best_path = candidates
        .iter()
        .filter(|c| c.contains('/'))
        .max_by_key(|c| c.len());
    if let Some(path) = best_path {
        return Some(path.clone());
    }

    if let Some(ip) = candidates.iter().find(|c| is_ipv4_shape(c)) {
        return Some(ip.clone());
    }

    candidates.into_iter().max_by_key(|c| c.len())
}

fn ascii_decode(seq: &[u32]) -> Option<String> {
    select_candidate(ascii_candidates(seq))
}

/// True for strings shaped like a dotted-quad IPv4 address.
fn is_ipv4_shape(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.len() <= 3 && o.chars().all(|c| c.is_ascii_digit()))
}

/// Number of fixed entry/column/sub-index slots between the classified
/// prefix and the identifying index.
const INDEX_SKIP: usize = 3;

/// Decode the positional-numeric layout for a classified value.
///
/// The identifying index starts at `index_prefix_len + 3`. The entity
/// type's template formats the remainder; templates fall back to the
/// generic layout when the remainder is too short for their own shape.
fn numeric_decode(
    seq: &[u32],
    class: &Classification,
    templates: &HashMap<EntityType, PathTemplate>,
) -> Option<String> {
    if class.index_prefix_len == 0 {
        return None;
    }

    let start = class.index_prefix_len + INDEX_SKIP;
    if seq.len() <= start {
        return None;
    }
    let rem = &seq[start..];

    let template = templates
        .get(&class.entity_type)
        .copied()
        .unwrap_or_default();

    match template {
        PathTemplate::Port if rem.len() >= 4 => {
            // Third element is a fixed sub-slot, not part of the path.
            Some(format!("{}/{}/{}", rem[0], rem[1], rem[3]))
        }
        PathTemplate::Card if rem.len() >= 3 => Some(format!("{}/{}.{}", rem[0], rem[1], rem[2])),
        _ => generic_decode(rem),
    }
}

fn generic_decode(rem: &[u32]) -> Option<String> {
    match rem.len() {
        0 | 1 => None,
        2 => Some(format!("{}/{}", rem[0], rem[1])),
        _ => Some(format!("{}/{}/{}", rem[0], rem[1], rem[2])),
    }
}

/// Encode a string as its length-prefixed ASCII-code sequence.
///
/// Inverse of the ASCII-run decode; exists for fixtures and for the
/// round-trip contract tests.
pub fn encode_ascii_index(value: &str) -> Vec<u32> {
    let mut seq = Vec::with_capacity(value.len() + 1);
    seq.push(value.len() as u32);
    seq.extend(value.chars().map(|c| c as u32));
    seq
}
