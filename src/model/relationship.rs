use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Id, Tool};

/// The three join tables hanging off a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Association {
    /// `toolbox_tools_types (tool_id, type_id)`
    ToolType,
    /// `toolbox_tools_relationships (origin_id, related_id)`
    RelatedTool,
    /// `toolbox_tools_tags (tool_id, tag_id)`
    Tag,
}

impl Association {
    /// Join table with its origin and related key columns
    pub fn table(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Association::ToolType => ("toolbox_tools_types", "tool_id", "type_id"),
            Association::RelatedTool => ("toolbox_tools_relationships", "origin_id", "related_id"),
            Association::Tag => ("toolbox_tools_tags", "tool_id", "tag_id"),
        }
    }
}

/// A many-to-many join row; `(origin_id, related_id)` is unique per association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub origin_id: Id,
    pub related_id: Id,
    pub created: DateTime<Utc>,
}

impl Relationship {
    pub fn new(origin_id: Id, related_id: Id) -> Self {
        Self {
            origin_id,
            related_id,
            created: Utc::now(),
        }
    }
}

/// A tool together with the ids of everything associated with it
#[derive(Debug, Clone, Serialize)]
pub struct ToolDetail {
    #[serde(flatten)]
    pub tool: Tool,
    pub type_ids: Vec<Id>,
    pub related_tool_ids: Vec<Id>,
    pub tag_ids: Vec<Id>,
}

/// Everything the related-tools edit view needs
#[derive(Debug, Clone, Serialize)]
pub struct RelatedToolsContext {
    pub tool: Tool,
    pub other_tools: Vec<Tool>,
    pub selected_tool_ids: Vec<Id>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedToolsUpdate {
    #[serde(default)]
    pub related_tool_ids: Vec<Id>,
}
