//! Naming/Identity Resolver.
//!
//! Derives platform-legal, collision-resistant identifiers from the
//! organization name and the run's creation timestamp. Pure: the same
//! inputs always produce the same `NameSet`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp rendering used in schema and agent names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Resolved resource names for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSet {
    pub schema: String,
    pub semantic_view: String,
    pub search_index: String,
    pub agent: String,
}

/// Sanitize a raw name into a platform-legal identifier: uppercase, every
/// non-alphanumeric character (notably `-` and spaces) replaced with `_`.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Resolve all resource names for one run.
///
/// Schema and agent names are timestamp-qualified so repeated runs for the
/// same organization never collide; the semantic view lives inside the
/// (already unique) schema and keeps the platform's `_SEMANTIC_MODEL`
/// suffix convention.
pub fn resolve_names(organization: &str, timestamp: DateTime<Utc>) -> NameSet {
    let org = sanitize_identifier(organization);
    let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();

    NameSet {
        schema: format!("{org}_DEMO_{stamp}"),
        semantic_view: format!("{org}_SEMANTIC_VIEW_SEMANTIC_MODEL"),
        search_index: format!("{org}_SEARCH_SERVICE"),
        agent: format!("{org}_{stamp}_AGENT"),
    }
}
