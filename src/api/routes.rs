use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::api::handlers::{self, AppState};
use crate::model::{Tool, ToolType};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Flash notices for the acting user
        .route("/admin/notices", get(handlers::drain_notices::<S>))
        // Tools
        .route(
            "/admin/tools",
            get(handlers::list_records::<S, Tool>).post(handlers::create_record::<S, Tool>),
        )
        .route("/admin/tools/archived", get(handlers::list_archived_records::<S, Tool>))
        .route("/admin/tools/new", get(handlers::new_record::<Tool>))
        .route("/admin/tools/archive", post(handlers::archive_records::<S, Tool>))
        .route("/admin/tools/unarchive", post(handlers::unarchive_records::<S, Tool>))
        .route("/admin/tools/publish", post(handlers::publish_records::<S, Tool>))
        .route("/admin/tools/unpublish", post(handlers::unpublish_records::<S, Tool>))
        .route("/admin/tools/destroy", post(handlers::destroy_records::<S, Tool>))
        .route("/admin/tools/:id", get(handlers::get_tool::<S>))
        .route("/admin/tools/:id/publish", post(handlers::publish_tool::<S>))
        .route("/admin/tools/:id/unpublish", post(handlers::unpublish_tool::<S>))
        .route("/admin/tools/:id/types", get(handlers::get_tool_types::<S>))
        .route("/admin/tools/:id/tags", get(handlers::get_tool_tags::<S>))
        .route("/admin/tools/:id/related-tools", get(handlers::get_related_tool_list::<S>))
        .route(
            "/admin/tools/:id/related",
            get(handlers::get_related_tools::<S>).put(handlers::update_related_tools::<S>),
        )
        // Tool types
        .route(
            "/admin/tooltypes",
            get(handlers::list_records::<S, ToolType>).post(handlers::create_record::<S, ToolType>),
        )
        .route(
            "/admin/tooltypes/archived",
            get(handlers::list_archived_records::<S, ToolType>),
        )
        .route("/admin/tooltypes/new", get(handlers::new_record::<ToolType>))
        .route("/admin/tooltypes/archive", post(handlers::archive_records::<S, ToolType>))
        .route(
            "/admin/tooltypes/unarchive",
            post(handlers::unarchive_records::<S, ToolType>),
        )
        .route("/admin/tooltypes/destroy", post(handlers::destroy_records::<S, ToolType>))
}

/// Serve static admin assets from `dir` under `/admin/assets`
pub fn with_assets<S: Store + 'static>(router: Router<AppState<S>>, dir: Option<&str>) -> Router<AppState<S>> {
    match dir {
        Some(dir) => router.nest_service("/admin/assets", ServeDir::new(dir)),
        None => router,
    }
}
