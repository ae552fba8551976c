use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Json, Response},
    Json as RequestJson,
};
use itertools::Itertools;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AdminConfig;
use crate::logic::{
    compose, created, single_rejected, BulkError, BulkOperationExecutor, Notice, NoticeBoard, NotificationSink,
    RecordObserver, Strategy, ToolRelations,
};
use crate::model::{
    Association, Id, ListFilter, OperationKind, Page, Record, RecordKind, RelatedToolsContext, RelatedToolsUpdate, Tag,
    Tool, ToolDetail, ToolType, UserContext,
};
use crate::store::traits::{RecordStore, Store, StoreError};

/// Shared state handed to every handler
pub struct AppContext<S> {
    pub notices: NoticeBoard,
    pub observer: Arc<dyn RecordObserver>,
    pub admin: AdminConfig,
    pub store: Arc<S>,
}

impl<S> AppContext<S> {
    pub fn new(store: Arc<S>, observer: Arc<dyn RecordObserver>, admin: AdminConfig) -> Self {
        Self {
            notices: NoticeBoard::new(),
            observer,
            admin,
            store,
        }
    }
}

pub type AppState<S> = Arc<AppContext<S>>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Body of the bulk action endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub ids: Vec<Id>,
    /// Where to go when everything went through
    pub forward: Option<String>,
    /// Where to go back to when something failed
    pub origin: Option<String>,
}

/// Counts returned alongside the redirect of a bulk action
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: Option<Id>,
    pub errors: Vec<String>,
    pub location: String,
}

fn not_found(kind: RecordKind, id: Id) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(&format!("{} {} not found", kind.noun(), id))),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    error!("Request failed: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&format!("Internal error: {}", err))),
    )
}

fn bulk_error(err: BulkError) -> ApiError {
    match err {
        BulkError::Infrastructure(err) => internal_error(err),
        other => (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&other.to_string()))),
    }
}

/// Only same-site absolute paths are followed; anything else falls back
fn redirect_target(requested: Option<&str>, fallback: &str) -> String {
    match requested {
        Some(url) if url.starts_with('/') && !url.starts_with("//") => url.to_string(),
        _ => fallback.to_string(),
    }
}

fn see_other<T: Serialize>(location: &str, body: T) -> Response {
    (StatusCode::SEE_OTHER, [(LOCATION, location.to_string())], Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// List views
// ---------------------------------------------------------------------------

async fn list_page<S, R>(state: &AppState<S>, filter: ListFilter, archived: bool) -> Result<Json<Page<R>>, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    let filter = filter.with_defaults(state.admin.list_limit, state.admin.default_sort_dir);
    RecordStore::<R>::list(&*state.store, &filter, archived)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn list_records<S, R>(
    State(state): State<AppState<S>>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Page<R>>, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    list_page(&state, filter, false).await
}

pub async fn list_archived_records<S, R>(
    State(state): State<AppState<S>>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Page<R>>, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    list_page(&state, filter, true).await
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// A record pre-populated with defaults for the edit form
pub async fn new_record<R: Record>() -> Json<R> {
    Json(R::blank())
}

/// Link a freshly inserted record; on failure the record is deleted again
async fn link_created<S, R>(store: &S, record: &R, links: &[(Association, Id)]) -> anyhow::Result<()>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    for &(association, related_id) in links {
        if let Err(err) = store.link(association, record.id(), related_id).await {
            warn!(
                "linking {} {} failed, removing it again",
                R::KIND.noun(),
                record.id()
            );
            if let Err(undo) = RecordStore::<R>::delete(store, record).await {
                error!("could not remove {} {}: {}", R::KIND.noun(), record.id(), undo);
            }
            return Err(err);
        }
    }
    Ok(())
}

pub async fn create_record<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(draft): RequestJson<R::Draft>,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    let links = ToolRelations::existing_links(&*state.store, R::draft_links(&draft))
        .await
        .map_err(internal_error)?;
    let location = R::KIND.list_url();

    match RecordStore::<R>::insert(&*state.store, R::from_draft(draft)).await {
        Ok(record) => {
            link_created(&*state.store, &record, &links)
                .await
                .map_err(internal_error)?;
            info!("{} created {} {}", user.label(), R::KIND.noun(), record.id());
            state.notices.notify(&user, created::<R>(None));
            Ok(see_other(
                location,
                CreateResponse {
                    id: Some(record.id()),
                    errors: Vec::new(),
                    location: location.to_string(),
                },
            ))
        }
        Err(StoreError::Rejected { messages, .. }) => {
            state.notices.notify(&user, created::<R>(Some(messages.as_slice())));
            Ok(see_other(
                location,
                CreateResponse {
                    id: None,
                    errors: messages,
                    location: location.to_string(),
                },
            ))
        }
        Err(StoreError::Infrastructure(err)) => Err(internal_error(err)),
    }
}

// ---------------------------------------------------------------------------
// Bulk actions
// ---------------------------------------------------------------------------

async fn run_bulk<S, R>(
    state: &AppState<S>,
    user: &UserContext,
    operation: OperationKind,
    request: BulkRequest,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    let ids: Vec<Id> = request.ids.into_iter().unique().collect();

    let executor = BulkOperationExecutor::new(&*state.store, &*state.observer, user);
    let outcome = executor
        .execute::<R>(operation, &ids)
        .await
        .map_err(bulk_error)?;

    let report = compose(operation, &outcome);
    for notice in report.notices {
        state.notices.notify(user, notice);
    }

    let location = if report.succeeded {
        redirect_target(request.forward.as_deref(), R::KIND.list_url())
    } else {
        redirect_target(request.origin.as_deref(), R::KIND.list_url())
    };

    Ok(see_other(
        &location,
        BulkResponse {
            succeeded: outcome.succeeded_count(),
            failed: outcome.failed_count(),
            location: location.clone(),
        },
    ))
}

pub async fn archive_records<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(request): RequestJson<BulkRequest>,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    run_bulk::<S, R>(&state, &user, OperationKind::Archive, request).await
}

pub async fn unarchive_records<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(request): RequestJson<BulkRequest>,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    run_bulk::<S, R>(&state, &user, OperationKind::Unarchive, request).await
}

pub async fn publish_records<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(request): RequestJson<BulkRequest>,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    run_bulk::<S, R>(&state, &user, OperationKind::Publish, request).await
}

pub async fn unpublish_records<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(request): RequestJson<BulkRequest>,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    run_bulk::<S, R>(&state, &user, OperationKind::Unpublish, request).await
}

pub async fn destroy_records<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(request): RequestJson<BulkRequest>,
) -> Result<Response, ApiError>
where
    S: Store + RecordStore<R>,
    R: Record,
{
    run_bulk::<S, R>(&state, &user, OperationKind::Destroy, request).await
}

/// Publish or unpublish one tool. Success is silent; a refusal is reported
/// with its errors. Either way the tool list comes next.
async fn toggle_tool<S: Store>(
    state: &AppState<S>,
    user: &UserContext,
    id: Id,
    operation: OperationKind,
) -> Result<Response, ApiError> {
    let executor = BulkOperationExecutor::new(&*state.store, &*state.observer, user);
    let outcome = executor
        .execute_with::<Tool>(operation, &[id], Strategy::PerRecord)
        .await
        .map_err(bulk_error)?;

    let Some(report) = outcome.report() else {
        return Err(internal_error(anyhow::anyhow!("{} did not report per record", operation)));
    };
    if report.successes().is_empty() && report.failures().is_empty() {
        return Err(not_found(RecordKind::Tool, id));
    }
    for failure in report.failures() {
        state
            .notices
            .notify(user, single_rejected::<Tool>(operation, &failure.errors));
    }

    let location = RecordKind::Tool.list_url();
    Ok(see_other(
        location,
        BulkResponse {
            succeeded: outcome.succeeded_count(),
            failed: outcome.failed_count(),
            location: location.to_string(),
        },
    ))
}

pub async fn publish_tool<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
) -> Result<Response, ApiError> {
    toggle_tool(&state, &user, id, OperationKind::Publish).await
}

pub async fn unpublish_tool<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
) -> Result<Response, ApiError> {
    toggle_tool(&state, &user, id, OperationKind::Unpublish).await
}

// ---------------------------------------------------------------------------
// Tool relationships
// ---------------------------------------------------------------------------

pub async fn get_tool<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<ToolDetail>, ApiError> {
    ToolRelations::detail(&*state.store, id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found(RecordKind::Tool, id))
}

pub async fn get_tool_types<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Vec<ToolType>>, ApiError> {
    ToolRelations::types(&*state.store, id)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_tool_tags<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    ToolRelations::tags(&*state.store, id)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// The tools linked to this one, in link order
pub async fn get_related_tool_list<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Vec<Tool>>, ApiError> {
    ToolRelations::related_tools(&*state.store, id)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_related_tools<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<RelatedToolsContext>, ApiError> {
    ToolRelations::related_context(&*state.store, id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found(RecordKind::Tool, id))
}

pub async fn update_related_tools<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
    RequestJson(update): RequestJson<RelatedToolsUpdate>,
) -> Result<Json<RelatedToolsContext>, ApiError> {
    let exists = RecordStore::<Tool>::load_by_id(&*state.store, id)
        .await
        .map_err(internal_error)?
        .is_some();
    if !exists {
        return Err(not_found(RecordKind::Tool, id));
    }

    ToolRelations::update_related(&*state.store, id, &update.related_tool_ids)
        .await
        .map_err(internal_error)?;
    state
        .notices
        .notify_success(&user, "The related tools were saved.");

    ToolRelations::related_context(&*state.store, id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found(RecordKind::Tool, id))
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// Pending flash notices for the current user; reading them clears them
pub async fn drain_notices<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
) -> Json<Vec<Notice>> {
    Json(state.notices.drain(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldUpdate;
    use crate::store::traits::RelationshipStore;
    use crate::store::MemoryStore;

    /// Memory store whose join table refuses every new row
    struct LinkRefusingStore(MemoryStore);

    #[async_trait::async_trait]
    impl<R: Record> RecordStore<R> for LinkRefusingStore
    where
        MemoryStore: RecordStore<R>,
    {
        async fn load_by_id(&self, id: Id) -> anyhow::Result<Option<R>> {
            RecordStore::<R>::load_by_id(&self.0, id).await
        }

        async fn list(&self, filter: &ListFilter, archived: bool) -> anyhow::Result<Page<R>> {
            RecordStore::<R>::list(&self.0, filter, archived).await
        }

        async fn insert(&self, record: R) -> Result<R, StoreError> {
            RecordStore::<R>::insert(&self.0, record).await
        }

        async fn save(&self, record: &R) -> Result<R, StoreError> {
            RecordStore::<R>::save(&self.0, record).await
        }

        async fn delete(&self, record: &R) -> Result<(), StoreError> {
            RecordStore::<R>::delete(&self.0, record).await
        }

        async fn set_update_where_id_in(&self, update: &FieldUpdate, ids: &[Id]) -> anyhow::Result<u64> {
            RecordStore::<R>::set_update_where_id_in(&self.0, update, ids).await
        }

        async fn delete_where_id_in(&self, ids: &[Id]) -> anyhow::Result<u64> {
            RecordStore::<R>::delete_where_id_in(&self.0, ids).await
        }
    }

    #[async_trait::async_trait]
    impl RelationshipStore for LinkRefusingStore {
        async fn related_ids(&self, association: Association, origin_id: Id) -> anyhow::Result<Vec<Id>> {
            self.0.related_ids(association, origin_id).await
        }

        async fn link(&self, association: Association, origin_id: Id, _related_id: Id) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("insert into {:?} for {} violates a foreign key", association, origin_id))
        }

        async fn replace_links(&self, association: Association, origin_id: Id, related_ids: &[Id]) -> anyhow::Result<()> {
            self.0.replace_links(association, origin_id, related_ids).await
        }

        async fn get_tags(&self, ids: &[Id]) -> anyhow::Result<Vec<Tag>> {
            self.0.get_tags(ids).await
        }

        async fn upsert_tag(&self, raw_tag: &str) -> anyhow::Result<Tag> {
            self.0.upsert_tag(raw_tag).await
        }

        async fn other_tools(&self, exclude: &[Id]) -> anyhow::Result<Vec<Tool>> {
            self.0.other_tools(exclude).await
        }
    }

    #[tokio::test]
    async fn test_failed_link_removes_the_created_record() {
        let store = LinkRefusingStore(MemoryStore::new());
        store.0.import(ToolType::new("Discussion"));
        let tool = RecordStore::<Tool>::insert(&store, Tool::new("Carousel", "Kagan", "4"))
            .await
            .unwrap();

        let result = link_created(&store, &tool, &[(Association::ToolType, 1)]).await;

        assert!(result.is_err());
        assert!(RecordStore::<Tool>::load_by_id(&store, tool.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_without_links_needs_no_join_rows() {
        let store = LinkRefusingStore(MemoryStore::new());
        let tool = RecordStore::<Tool>::insert(&store, Tool::new("Carousel", "Kagan", "4"))
            .await
            .unwrap();

        link_created(&store, &tool, &[]).await.unwrap();
        assert!(RecordStore::<Tool>::load_by_id(&store, tool.id).await.unwrap().is_some());
    }

    #[test]
    fn test_redirect_target_only_follows_local_paths() {
        assert_eq!(redirect_target(Some("/admin/tools?page=2"), "/admin/tools"), "/admin/tools?page=2");
        assert_eq!(redirect_target(Some("https://evil.example"), "/admin/tools"), "/admin/tools");
        assert_eq!(redirect_target(Some("//evil.example"), "/admin/tools"), "/admin/tools");
        assert_eq!(redirect_target(None, "/admin/tooltypes"), "/admin/tooltypes");
    }

    #[test]
    fn test_bulk_request_defaults() {
        let request: BulkRequest = serde_json::from_str(r#"{"ids": [3, 1]}"#).unwrap();
        assert_eq!(request.ids, vec![3, 1]);
        assert!(request.forward.is_none());
        assert!(request.origin.is_none());
    }

    #[test]
    fn test_input_contract_errors_are_bad_requests() {
        let (status, _) = bulk_error(BulkError::EmptyIdSet);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = bulk_error(BulkError::Infrastructure(anyhow::anyhow!("connection refused")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
