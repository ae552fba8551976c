use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A free-form label attached to tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Id,
    /// Normalized form used for matching (lowercase, alphanumeric only)
    pub tag: String,
    /// The label as it was entered
    pub raw_tag: String,
}

impl Tag {
    pub fn new(id: Id, raw_tag: impl Into<String>) -> Self {
        let raw_tag = raw_tag.into();
        Self {
            id,
            tag: normalize_tag(&raw_tag),
            raw_tag,
        }
    }
}

/// Normalize a raw tag the way tag lookups compare them
pub fn normalize_tag(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
