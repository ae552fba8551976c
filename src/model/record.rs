use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::{Association, Id, RecordKind, SortValue};

/// Behaviour shared by every record the admin can list, archive and destroy
pub trait Record: Clone + Serialize + Send + Sync + 'static {
    /// Submitted form data a new record is built from
    type Draft: DeserializeOwned + Send + 'static;

    const KIND: RecordKind;
    /// Storage table
    const TABLE: &'static str;
    /// Column the list search matches against
    const SEARCH_COLUMN: &'static str;
    /// Columns a list view may sort by; the first is the default
    const SORTABLE: &'static [&'static str];
    const PUBLISHABLE: bool;

    /// A record pre-populated with defaults
    fn blank() -> Self;
    fn from_draft(draft: Self::Draft) -> Self;

    /// Join rows a draft asks for once the record exists
    fn draft_links(_draft: &Self::Draft) -> Vec<(Association, Id)> {
        Vec::new()
    }

    fn id(&self) -> Id;
    fn set_id(&mut self, id: Id);
    fn set_created(&mut self, created: DateTime<Utc>);
    fn display_name(&self) -> &str;

    fn archived(&self) -> bool;
    fn set_archived(&mut self, archived: bool);

    fn published(&self) -> bool {
        false
    }
    fn set_published(&mut self, _published: bool) {}

    /// Field-level rule violations, empty when the record may be saved
    fn validate(&self) -> Vec<String>;

    fn sort_value(&self, column: &str) -> Option<SortValue>;

    /// Apply a set-based field update to an in-memory copy
    fn apply_update(&mut self, update: &FieldUpdate) {
        if let Some(archived) = update.archived {
            self.set_archived(archived);
        }
        if let Some(published) = update.published {
            if Self::PUBLISHABLE {
                self.set_published(published);
            }
        }
    }

    /// Resolve a requested sort column against the whitelist
    fn sort_column(requested: Option<&str>) -> &'static str {
        requested
            .and_then(|col| Self::SORTABLE.iter().find(|c| **c == col).copied())
            .unwrap_or(Self::SORTABLE[0])
    }
}

/// Columns changed by a set-based update (`UPDATE ... WHERE id IN (...)`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl FieldUpdate {
    pub fn archived(archived: bool) -> Self {
        Self {
            archived: Some(archived),
            published: None,
        }
    }

    pub fn published(published: bool) -> Self {
        Self {
            archived: None,
            published: Some(published),
        }
    }

    pub fn and_published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }
}
