use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::logic::events::{RecordEvent, RecordObserver};
use crate::model::{FieldUpdate, Id, OperationKind, Record, RecordKind, UserContext};
use crate::store::traits::{FailureKind, RecordStore, StoreError};

/// How a bulk operation reaches storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One `UPDATE`/`DELETE ... WHERE id IN (...)`; only the affected row count is known
    SetUpdate,
    /// Load, change and persist each record, reporting failures per record
    PerRecord,
}

impl Strategy {
    /// The strategy the admin screens use for each kind and operation
    pub fn default_for(kind: RecordKind, operation: OperationKind) -> Strategy {
        use OperationKind::*;
        match (kind, operation) {
            (RecordKind::Tool, Archive | Unarchive) => Strategy::SetUpdate,
            (RecordKind::Tool, Publish | Unpublish | Destroy) => Strategy::PerRecord,
            (RecordKind::ToolType, Archive) => Strategy::PerRecord,
            (RecordKind::ToolType, Unarchive | Publish | Unpublish | Destroy) => Strategy::SetUpdate,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("no record ids were given")]
    EmptyIdSet,
    #[error("a {} cannot be {}", .kind.noun(), .operation.past_tense())]
    Unsupported {
        kind: RecordKind,
        operation: OperationKind,
    },
    /// Storage failed; no partial report is produced
    #[error("storage failure: {0}")]
    Infrastructure(#[from] anyhow::Error),
}

/// A record that storage refused, with the reasons in the order they were raised
#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord<R> {
    pub record: R,
    pub kind: FailureKind,
    pub errors: Vec<String>,
}

/// Records partitioned by outcome, each in input order
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<R> {
    succeeded: Vec<R>,
    failed: Vec<FailedRecord<R>>,
}

impl<R> Default for OperationResult<R> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<R> OperationResult<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no record failed; partial success counts as failure
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn successes(&self) -> &[R] {
        &self.succeeded
    }

    pub fn failures(&self) -> &[FailedRecord<R>] {
        &self.failed
    }

    pub fn push_success(&mut self, record: R) {
        self.succeeded.push(record);
    }

    pub fn push_failure(&mut self, record: R, kind: FailureKind, errors: Vec<String>) {
        self.failed.push(FailedRecord {
            record,
            kind,
            errors,
        });
    }
}

/// Result of a bulk operation under either strategy
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BulkOutcome<R> {
    /// Per-record strategy
    Report(OperationResult<R>),
    /// Set-update strategy
    Affected { requested: usize, rows: u64 },
}

impl<R> BulkOutcome<R> {
    pub fn succeeded_count(&self) -> usize {
        match self {
            BulkOutcome::Report(result) => result.successes().len(),
            BulkOutcome::Affected { rows, .. } => *rows as usize,
        }
    }

    pub fn failed_count(&self) -> usize {
        match self {
            BulkOutcome::Report(result) => result.failures().len(),
            BulkOutcome::Affected { .. } => 0,
        }
    }

    /// Per-record: nothing failed. Set-update: at least one row changed.
    pub fn is_success(&self) -> bool {
        match self {
            BulkOutcome::Report(result) => result.succeeded(),
            BulkOutcome::Affected { rows, .. } => *rows > 0,
        }
    }

    pub fn report(&self) -> Option<&OperationResult<R>> {
        match self {
            BulkOutcome::Report(result) => Some(result),
            BulkOutcome::Affected { .. } => None,
        }
    }
}

/// The columns an operation changes, `None` for destroy
pub fn field_update<R: Record>(operation: OperationKind) -> Option<FieldUpdate> {
    match operation {
        OperationKind::Archive if R::PUBLISHABLE => Some(FieldUpdate::archived(true).and_published(false)),
        OperationKind::Archive => Some(FieldUpdate::archived(true)),
        OperationKind::Unarchive => Some(FieldUpdate::archived(false)),
        OperationKind::Publish => Some(FieldUpdate::published(true)),
        OperationKind::Unpublish => Some(FieldUpdate::published(false)),
        OperationKind::Destroy => None,
    }
}

/// Applies archive/publish/destroy to a set of records for one request.
///
/// Identifiers are processed in the order given; deduplicating them is the
/// caller's job. Ids that match no record are skipped without being reported.
pub struct BulkOperationExecutor<'a, S: ?Sized> {
    store: &'a S,
    observer: &'a dyn RecordObserver,
    actor: &'a UserContext,
}

impl<'a, S: ?Sized> BulkOperationExecutor<'a, S> {
    pub fn new(store: &'a S, observer: &'a dyn RecordObserver, actor: &'a UserContext) -> Self {
        Self {
            store,
            observer,
            actor,
        }
    }

    /// Run `operation` with the default strategy for the record kind
    pub async fn execute<R>(&self, operation: OperationKind, ids: &[Id]) -> Result<BulkOutcome<R>, BulkError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        self.execute_with(operation, ids, Strategy::default_for(R::KIND, operation))
            .await
    }

    pub async fn execute_with<R>(
        &self,
        operation: OperationKind,
        ids: &[Id],
        strategy: Strategy,
    ) -> Result<BulkOutcome<R>, BulkError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        if ids.is_empty() {
            return Err(BulkError::EmptyIdSet);
        }
        if operation.requires_publishable() && !R::PUBLISHABLE {
            return Err(BulkError::Unsupported {
                kind: R::KIND,
                operation,
            });
        }

        info!(
            "{} requested {} of {} {} ({:?})",
            self.actor.label(),
            operation,
            ids.len(),
            R::KIND.plural(),
            strategy
        );

        match strategy {
            Strategy::SetUpdate => self.set_update::<R>(operation, ids).await,
            Strategy::PerRecord => self.per_record::<R>(operation, ids).await.map(BulkOutcome::Report),
        }
    }

    async fn set_update<R>(&self, operation: OperationKind, ids: &[Id]) -> Result<BulkOutcome<R>, BulkError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let rows = match field_update::<R>(operation) {
            Some(update) => RecordStore::<R>::set_update_where_id_in(self.store, &update, ids).await?,
            None => RecordStore::<R>::delete_where_id_in(self.store, ids).await?,
        };

        if rows > 0 {
            self.observer
                .records_changed(R::KIND, operation, ids, rows, self.actor);
        } else {
            warn!("{} of {:?} matched no {}", operation, ids, R::KIND.plural());
        }

        Ok(BulkOutcome::Affected {
            requested: ids.len(),
            rows,
        })
    }

    async fn per_record<R>(&self, operation: OperationKind, ids: &[Id]) -> Result<OperationResult<R>, BulkError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let update = field_update::<R>(operation);
        let mut result = OperationResult::new();

        for &id in ids {
            let Some(mut record) = RecordStore::<R>::load_by_id(self.store, id).await? else {
                debug!("skipping {} {}: no such record", R::KIND.noun(), id);
                continue;
            };

            let outcome = match &update {
                Some(update) => {
                    record.apply_update(update);
                    RecordStore::<R>::save(self.store, &record).await
                }
                None => RecordStore::<R>::delete(self.store, &record).await.map(|_| record.clone()),
            };

            match outcome {
                Ok(persisted) => {
                    self.observer.record_changed(&RecordEvent {
                        kind: R::KIND,
                        record_id: persisted.id(),
                        display_name: persisted.display_name().to_string(),
                        operation,
                        actor: self.actor.clone(),
                        occurred_at: Utc::now(),
                    });
                    result.push_success(persisted);
                }
                Err(StoreError::Rejected { kind, messages }) => {
                    warn!(
                        "could not {} {} {}: {}",
                        operation,
                        R::KIND.noun(),
                        id,
                        messages.join(", ")
                    );
                    result.push_failure(record, kind, messages);
                }
                Err(StoreError::Infrastructure(e)) => return Err(BulkError::Infrastructure(e)),
            }
        }

        Ok(result)
    }
}
