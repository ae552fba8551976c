use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::validate::Rules;
use crate::model::{Id, Record, RecordKind, SortValue};

/// A category tools can be filed under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolType {
    pub id: Id,
    pub description: String,
    pub archived: bool,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewToolType {
    #[serde(default)]
    pub description: String,
}

impl ToolType {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::blank()
        }
    }
}

impl Record for ToolType {
    type Draft = NewToolType;

    const KIND: RecordKind = RecordKind::ToolType;
    const TABLE: &'static str = "toolbox_tool_types";
    const SEARCH_COLUMN: &'static str = "description";
    const SORTABLE: &'static [&'static str] = &["description", "id", "created"];
    const PUBLISHABLE: bool = false;

    fn blank() -> Self {
        Self {
            id: 0,
            description: String::new(),
            archived: false,
            created: None,
        }
    }

    fn from_draft(draft: NewToolType) -> Self {
        Self::new(draft.description)
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn set_created(&mut self, created: DateTime<Utc>) {
        self.created = Some(created);
    }

    fn display_name(&self) -> &str {
        &self.description
    }

    fn archived(&self) -> bool {
        self.archived
    }

    fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
    }

    fn validate(&self) -> Vec<String> {
        Rules::new()
            .not_empty("description", &self.description)
            .finish()
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        match column {
            "id" => Some(SortValue::Int(self.id)),
            "description" => Some(SortValue::Text(self.description.clone())),
            "created" => Some(SortValue::Int(
                self.created.map(|c| c.timestamp()).unwrap_or_default(),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldUpdate;

    #[test]
    fn test_description_is_required() {
        assert_eq!(ToolType::blank().validate(), vec!["description: required".to_string()]);
        assert!(ToolType::new("Icebreaker").validate().is_empty());
    }

    #[test]
    fn test_published_update_is_ignored() {
        let mut tool_type = ToolType::new("Reflection");
        tool_type.apply_update(&FieldUpdate::archived(true).and_published(true));
        assert!(tool_type.archived);
        assert!(!tool_type.published());
    }
}
