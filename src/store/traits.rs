use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{Association, FieldUpdate, Id, ListFilter, Page, Record, Tag, Tool, ToolType};

/// Why storage refused to write a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Field rules rejected the record
    Validation,
    /// A referential or uniqueness constraint blocked the write
    Constraint,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record was refused; recoverable and reported per record
    #[error("record rejected ({kind:?}): {}", .messages.join(", "))]
    Rejected {
        kind: FailureKind,
        messages: Vec<String>,
    },
    /// Storage could not be reached or failed unexpectedly
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl StoreError {
    pub fn validation(messages: Vec<String>) -> Self {
        StoreError::Rejected {
            kind: FailureKind::Validation,
            messages,
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        StoreError::Rejected {
            kind: FailureKind::Constraint,
            messages: vec![message.into()],
        }
    }
}

/// Persistence of one record kind
#[async_trait::async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn load_by_id(&self, id: Id) -> Result<Option<R>>;
    /// One page of records with the given archived flag
    async fn list(&self, filter: &ListFilter, archived: bool) -> Result<Page<R>>;
    /// Validate and persist a new record, returning it with its assigned id
    async fn insert(&self, record: R) -> Result<R, StoreError>;
    /// Validate and persist changes to an existing record
    async fn save(&self, record: &R) -> Result<R, StoreError>;
    async fn delete(&self, record: &R) -> Result<(), StoreError>;
    /// `UPDATE ... WHERE id IN (ids)`, returning the affected row count
    async fn set_update_where_id_in(&self, update: &FieldUpdate, ids: &[Id]) -> Result<u64>;
    /// `DELETE ... WHERE id IN (ids)`, returning the affected row count
    async fn delete_where_id_in(&self, ids: &[Id]) -> Result<u64>;
}

/// Many-to-many joins between tools and their types, related tools and tags
#[async_trait::async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Related ids for an origin tool, in insertion order
    async fn related_ids(&self, association: Association, origin_id: Id) -> Result<Vec<Id>>;
    /// Add a join row; returns false when the pair already existed
    async fn link(&self, association: Association, origin_id: Id, related_id: Id) -> Result<bool>;
    /// Replace every join row of an origin with the given related ids
    async fn replace_links(&self, association: Association, origin_id: Id, related_ids: &[Id]) -> Result<()>;
    async fn get_tags(&self, ids: &[Id]) -> Result<Vec<Tag>>;
    /// Find a tag by its normalized form or create it
    async fn upsert_tag(&self, raw_tag: &str) -> Result<Tag>;
    /// Every tool except the given ones, ordered by name
    async fn other_tools(&self, exclude: &[Id]) -> Result<Vec<Tool>>;
}

pub trait Store: RecordStore<Tool> + RecordStore<ToolType> + RelationshipStore + Send + Sync {}

impl<T> Store for T where T: RecordStore<Tool> + RecordStore<ToolType> + RelationshipStore + Send + Sync {}
