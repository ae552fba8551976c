use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type Id = i64;

/// The kinds of records managed by the toolbox admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Tool,
    ToolType,
}

impl RecordKind {
    /// Lowercase noun used in user-facing messages ("tool", "type")
    pub fn noun(&self) -> &'static str {
        match self {
            RecordKind::Tool => "tool",
            RecordKind::ToolType => "type",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            RecordKind::Tool => "tools",
            RecordKind::ToolType => "types",
        }
    }

    /// Admin list URL the handlers fall back to when no redirect target was posted
    pub fn list_url(&self) -> &'static str {
        match self {
            RecordKind::Tool => "/admin/tools",
            RecordKind::ToolType => "/admin/tooltypes",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RecordKind::Tool => write!(f, "tool"),
            RecordKind::ToolType => write!(f, "tool_type"),
        }
    }
}

/// A bulk state transition requested from the admin list views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Archive,
    Unarchive,
    Publish,
    Unpublish,
    Destroy,
}

impl OperationKind {
    /// Past-tense verb used in audit events and partial-success messages
    pub fn past_tense(&self) -> &'static str {
        match self {
            OperationKind::Archive => "archived",
            OperationKind::Unarchive => "unarchived",
            OperationKind::Publish => "published",
            OperationKind::Unpublish => "unpublished",
            OperationKind::Destroy => "destroyed",
        }
    }

    pub fn requires_publishable(&self) -> bool {
        matches!(self, OperationKind::Publish | OperationKind::Unpublish)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OperationKind::Archive => write!(f, "archive"),
            OperationKind::Unarchive => write!(f, "unarchive"),
            OperationKind::Publish => write!(f, "publish"),
            OperationKind::Unpublish => write!(f, "unpublish"),
            OperationKind::Destroy => write!(f, "destroy"),
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "archive" => Ok(OperationKind::Archive),
            "unarchive" => Ok(OperationKind::Unarchive),
            "publish" => Ok(OperationKind::Publish),
            "unpublish" => Ok(OperationKind::Unpublish),
            "destroy" => Ok(OperationKind::Destroy),
            _ => Err(format!("Unknown operation: {}", s)),
        }
    }
}

/// Comparable column value used when sorting records held in memory
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl SortValue {
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Int(a), SortValue::Int(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (SortValue::Bool(a), SortValue::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}
