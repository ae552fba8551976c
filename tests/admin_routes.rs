use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use toolbox_admin::config::AppConfig;
use toolbox_admin::store::RecordStore;
use toolbox_admin::{build_app, MemoryStore, Tool, ToolType};

fn catalogue() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.import(Tool::new("Gallery Walk", "Handbook", "3"));
    // Predates the name rule, so it can no longer be saved as is
    store.import(Tool::new("", "Handbook", "2"));
    store.import(Tool::new("Fishbowl", "Priles", "whole group"));
    store.import(ToolType::new("Discussion"));
    store.import(ToolType::new("Reflection"));
    Arc::new(store)
}

fn app(store: &Arc<MemoryStore>) -> Router {
    build_app(store.clone(), &AppConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "editor-1")
        .header("x-user-name", "Editor");
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, location, json)
}

#[tokio::test]
async fn test_health_check() {
    let store = catalogue();
    let (status, _, body) = send(&app(&store), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_partial_publish_reports_each_failure_and_returns_to_origin() {
    let store = catalogue();
    let app = app(&store);

    let (status, location, body) = send(
        &app,
        "POST",
        "/admin/tools/publish",
        Some(json!({"ids": [1, 2, 3], "forward": "/admin/tools?done=1", "origin": "/admin/tools?page=2"})),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tools?page=2"));
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);

    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    assert_eq!(
        notices,
        json!([
            {"level": "error", "message": "The following tools could not be published:\ntool #2: name: required"},
            {"level": "success", "message": "The following tools were published: Gallery Walk, Fishbowl."}
        ])
    );

    // Drained on read
    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    assert_eq!(notices, json!([]));

    let published = RecordStore::<Tool>::load_by_id(&*store, 3).await.unwrap().unwrap();
    assert!(published.published);
    let untouched = RecordStore::<Tool>::load_by_id(&*store, 2).await.unwrap().unwrap();
    assert!(!untouched.published);
}

#[tokio::test]
async fn test_archive_moves_tools_to_archived_list() {
    let store = catalogue();
    let app = app(&store);

    send(&app, "POST", "/admin/tools/1/publish", None).await;

    let (status, location, _) = send(
        &app,
        "POST",
        "/admin/tools/archive",
        Some(json!({"ids": [1, 1, 99], "forward": "/admin/tools/archived"})),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tools/archived"));

    let (_, _, archived) = send(&app, "GET", "/admin/tools/archived", None).await;
    assert_eq!(archived["total"], 1);
    assert_eq!(archived["items"][0]["name"], "Gallery Walk");
    assert_eq!(archived["items"][0]["published"], false);

    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    let messages: Vec<&str> = notices
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, vec!["The selected tools were archived."]);
}

#[tokio::test]
async fn test_single_publish_reports_refusal_and_returns_to_list() {
    let store = catalogue();
    let app = app(&store);

    let (status, location, body) = send(&app, "POST", "/admin/tools/3/publish", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tools"));
    assert_eq!(body["succeeded"], 1);
    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    assert_eq!(notices, json!([]));

    let (status, location, body) = send(&app, "POST", "/admin/tools/2/publish", None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tools"));
    assert_eq!(body["failed"], 1);
    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    assert_eq!(
        notices,
        json!([{"level": "error", "message": "The tool could not be published:\n• name: required"}])
    );

    let (status, _, _) = send(&app, "POST", "/admin/tools/404/unpublish", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(RecordStore::<Tool>::load_by_id(&*store, 3).await.unwrap().unwrap().published);
    assert!(!RecordStore::<Tool>::load_by_id(&*store, 2).await.unwrap().unwrap().published);
}

#[tokio::test]
async fn test_empty_id_set_is_rejected() {
    let store = catalogue();
    let (status, location, body) = send(&app(&store), "POST", "/admin/tools/destroy", Some(json!({"ids": []}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(location.is_none());
    assert_eq!(body["error"], "no record ids were given");
    assert_eq!(store.count::<Tool>(), 3);
}

#[tokio::test]
async fn test_unarchive_without_matches_goes_back_to_origin() {
    let store = catalogue();
    let app = app(&store);

    let (status, location, body) = send(
        &app,
        "POST",
        "/admin/tooltypes/unarchive",
        Some(json!({"ids": [40, 41], "origin": "https://elsewhere.example"})),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tooltypes"));
    assert_eq!(body["succeeded"], 0);

    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    assert_eq!(notices[0]["message"], "The selected types could not be unarchived.");
}

#[tokio::test]
async fn test_list_search_sort_and_paging() {
    let store = catalogue();
    let app = app(&store);

    let (_, _, page) = send(&app, "GET", "/admin/tools?search=FISH", None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Fishbowl");
    assert_eq!(page["limit"], 20);

    let (_, _, page) = send(&app, "GET", "/admin/tools?sort=id&sort_dir=desc&limit=1&limitstart=1", None).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["id"], 2);

    let (_, _, page) = send(&app, "GET", "/admin/tooltypes?sort=nonsense", None).await;
    let names: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["description"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Discussion", "Reflection"]);
}

#[tokio::test]
async fn test_create_links_types_and_reports_validation_errors() {
    let store = catalogue();
    let app = app(&store);

    let (_, _, blank) = send(&app, "GET", "/admin/tools/new", None).await;
    assert_eq!(blank["duration"], 0);

    let (status, location, body) = send(
        &app,
        "POST",
        "/admin/tools",
        Some(json!({
            "name": "Think-Pair-Share",
            "source": "Lyman",
            "subgroup_size": "2",
            "duration": 10,
            "type_ids": [1, 2, 1]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tools"));
    let id = body["id"].as_i64().unwrap();

    let (_, _, detail) = send(&app, "GET", &format!("/admin/tools/{}", id), None).await;
    assert_eq!(detail["name"], "Think-Pair-Share");
    assert_eq!(detail["type_ids"], json!([1, 2]));

    let (_, _, types) = send(&app, "GET", &format!("/admin/tools/{}/types", id), None).await;
    assert_eq!(types[1]["description"], "Reflection");

    let (status, location, body) = send(&app, "POST", "/admin/tooltypes", Some(json!({"description": ""}))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tooltypes"));
    assert_eq!(body["errors"], json!(["description: required"]));

    let (_, _, notices) = send(&app, "GET", "/admin/notices", None).await;
    assert_eq!(
        notices,
        json!([
            {"level": "success", "message": "The tool was created."},
            {"level": "error", "message": "The type could not be created:\n• description: required"}
        ])
    );
}

#[tokio::test]
async fn test_create_skips_unknown_type_ids() {
    let store = catalogue();
    let app = app(&store);

    let (status, _, body) = send(
        &app,
        "POST",
        "/admin/tools",
        Some(json!({"name": "Carousel", "source": "Kagan", "subgroup_size": "4", "type_ids": [999, 2]})),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let id = body["id"].as_i64().unwrap();

    let (_, _, detail) = send(&app, "GET", &format!("/admin/tools/{}", id), None).await;
    assert_eq!(detail["type_ids"], json!([2]));
    let (_, _, types) = send(&app, "GET", &format!("/admin/tools/{}/types", id), None).await;
    assert_eq!(types.as_array().unwrap().len(), 1);
    assert_eq!(types[0]["description"], "Reflection");

    let (status, _, body) = send(
        &app,
        "POST",
        "/admin/tools",
        Some(json!({"name": "Snowball", "source": "Kagan", "subgroup_size": "2", "type_ids": [999]})),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let id = body["id"].as_i64().unwrap();
    let (_, _, detail) = send(&app, "GET", &format!("/admin/tools/{}", id), None).await;
    assert_eq!(detail["type_ids"], json!([]));
}

#[tokio::test]
async fn test_related_tools_edit() {
    let store = catalogue();
    let app = app(&store);

    let (status, _, context) = send(
        &app,
        "PUT",
        "/admin/tools/1/related",
        Some(json!({"related_tool_ids": [1, 3, 3, 77]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(context["selected_tool_ids"], json!([3]));
    let others: Vec<i64> = context["other_tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert!(!others.contains(&1));

    let (status, _, related) = send(&app, "GET", "/admin/tools/1/related-tools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(related.as_array().unwrap().len(), 1);
    assert_eq!(related[0]["name"], "Fishbowl");

    let (status, _, _) = send(&app, "GET", "/admin/tools/404/related", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_destroying_types_removes_them() {
    let store = catalogue();
    let app = app(&store);

    let (status, location, body) = send(&app, "POST", "/admin/tooltypes/destroy", Some(json!({"ids": [2]}))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/admin/tooltypes"));
    assert_eq!(body["succeeded"], 1);
    assert_eq!(store.count::<ToolType>(), 1);
}
