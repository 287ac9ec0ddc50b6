use anyhow::{Result, anyhow};

/// Parse an OID string (e.g., "1.3.6.1.2.1.1.3.0") into numeric components.
pub fn parse_oid(oid_str: &str) -> Result<Vec<u32>> {
    oid_str
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|e| anyhow!("Failed to parse OID '{}': {}", oid_str, e))
        })
        .collect()
}

/// Convert numeric OID components back to a dotted string representation.
pub fn oid_to_string(oid: &[u32]) -> String {
    oid.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Check if an OID is a child of (or equal to) a parent OID.
pub fn oid_starts_with(oid: &[u32], parent: &[u32]) -> bool {
    oid.len() >= parent.len() && oid[..parent.len()] == *parent
}
