use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::validate::Rules;
use crate::model::{Association, Id, Record, RecordKind, SortValue};

/// A catalogued activity tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: Id,
    pub name: String,
    pub minimum_participants: i32,
    pub suggested_participants: i32,
    pub maximum_participants: i32,
    pub duration: i32, // minutes
    pub cost: f64,
    pub source: String,
    pub subgroup_size: String,
    pub materials: Option<String>,
    pub notes: Option<String>,
    pub archived: bool,
    pub published: bool,
    pub created: Option<DateTime<Utc>>,
}

/// Input model for creating a new tool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTool {
    #[serde(default)]
    pub name: String,
    pub minimum_participants: Option<i32>,
    pub suggested_participants: Option<i32>,
    pub maximum_participants: Option<i32>,
    pub duration: Option<i32>,
    pub cost: Option<f64>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub subgroup_size: String,
    pub materials: Option<String>,
    pub notes: Option<String>,
    /// Types to associate once the tool has been persisted
    #[serde(default)]
    pub type_ids: Vec<Id>,
}

impl Tool {
    pub fn new(name: impl Into<String>, source: impl Into<String>, subgroup_size: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            subgroup_size: subgroup_size.into(),
            ..Self::blank()
        }
    }
}

impl Record for Tool {
    type Draft = NewTool;

    const KIND: RecordKind = RecordKind::Tool;
    const TABLE: &'static str = "toolbox_tools";
    const SEARCH_COLUMN: &'static str = "name";
    const SORTABLE: &'static [&'static str] = &[
        "name",
        "id",
        "created",
        "published",
        "duration",
        "cost",
        "minimum_participants",
        "maximum_participants",
    ];
    const PUBLISHABLE: bool = true;

    fn blank() -> Self {
        Self {
            id: 0,
            name: String::new(),
            minimum_participants: 0,
            suggested_participants: 0,
            maximum_participants: 0,
            duration: 0,
            cost: 0.0,
            source: String::new(),
            subgroup_size: String::new(),
            materials: None,
            notes: None,
            archived: false,
            published: false,
            created: None,
        }
    }

    fn from_draft(draft: NewTool) -> Self {
        let blank = Self::blank();
        Self {
            name: draft.name,
            minimum_participants: draft.minimum_participants.unwrap_or(blank.minimum_participants),
            suggested_participants: draft.suggested_participants.unwrap_or(blank.suggested_participants),
            maximum_participants: draft.maximum_participants.unwrap_or(blank.maximum_participants),
            duration: draft.duration.unwrap_or(blank.duration),
            cost: draft.cost.unwrap_or(blank.cost),
            source: draft.source,
            subgroup_size: draft.subgroup_size,
            materials: draft.materials,
            notes: draft.notes,
            ..blank
        }
    }

    fn draft_links(draft: &NewTool) -> Vec<(Association, Id)> {
        draft
            .type_ids
            .iter()
            .map(|type_id| (Association::ToolType, *type_id))
            .collect()
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
        &self.name
    }

    fn archived(&self) -> bool {
        self.archived
    }

    fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
    }

    fn published(&self) -> bool {
        self.published
    }

    fn set_published(&mut self, published: bool) {
        self.published = published;
    }

    fn validate(&self) -> Vec<String> {
        Rules::new()
            .not_empty("name", &self.name)
            .positive("minimum_participants", self.minimum_participants)
            .positive("suggested_participants", self.suggested_participants)
            .positive("maximum_participants", self.maximum_participants)
            .positive("duration", self.duration)
            .positive("cost", self.cost)
            .not_empty("source", &self.source)
            .not_empty("subgroup_size", &self.subgroup_size)
            .finish()
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        let value = match column {
            "id" => SortValue::Int(self.id),
            "name" => SortValue::Text(self.name.clone()),
            "created" => SortValue::Int(self.created.map(|c| c.timestamp()).unwrap_or_default()),
            "published" => SortValue::Bool(self.published),
            "duration" => SortValue::Int(self.duration.into()),
            "cost" => SortValue::Float(self.cost),
            "minimum_participants" => SortValue::Int(self.minimum_participants.into()),
            "maximum_participants" => SortValue::Int(self.maximum_participants.into()),
            _ => return None,
        };
        Some(value)
    }
}
