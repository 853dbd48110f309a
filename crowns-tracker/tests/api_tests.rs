//! Integration tests for crowns-tracker API endpoints
//!
//! Tests cover:
//! - Health and build info (no identity required)
//! - Identity headers and first-use seeding
//! - Dashboard, import, toggle, export
//! - Owner and public carousels, publishing, directory

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use crowns_common::store::{CrownStore, MemoryStore, Namespace, SqliteStore};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use crowns_tracker::{build_router, AppState, Tracker};

const TABLE: &[u8] = b"Monstruo;Corona Peque\xf1a;Corona Grande\nRathalos;1;0\nDiablos;0;0\n";

/// Test helper: assets folder with a template and one piece of artwork
fn setup_assets() -> TempDir {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    std::fs::write(
        dir.path().join("template.csv"),
        "Monstruo;Corona Pequeña;Corona Grande\nRathalos;1;1\nKirin;0;0\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("monsters")).unwrap();
    std::fs::write(dir.path().join("monsters/rathalos.png"), b"png").unwrap();
    dir
}

/// Test helper: router over the given store, seeding from the assets template
fn setup_app(store: Arc<dyn CrownStore>, assets: &Path) -> Router {
    let tracker = Tracker::new(store).with_template(Some(assets.join("template.csv")));
    build_router(AppState::new(tracker, assets.to_path_buf()))
}

fn setup_memory_app(assets: &Path) -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let app = setup_app(store.clone(), assets);
    (store, app)
}

/// Test helper: request carrying the identity headers for `uid`
fn user_request(method: &str, uri: &str, uid: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-auth-uid", uid)
        .header("x-auth-name", format!("User {}", uid))
        .header("x-auth-email", format!("{}@example.com", uid))
        .body(body)
        .unwrap()
}

fn json_request(method: &str, uri: &str, uid: &str, body: Value) -> Request<Body> {
    let mut request = user_request(method, uri, uid, Body::from(body.to_string()));
    request
        .headers_mut()
        .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
    request
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

async fn import(app: &Router, uid: &str, bytes: &'static [u8], file_name: &str) -> axum::response::Response {
    let uri = format!("/api/import?file_name={}&encoding=latin1", file_name);
    app.clone()
        .oneshot(user_request("POST", &uri, uid, Body::from(bytes)))
        .await
        .unwrap()
}

// =============================================================================
// Health and build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "crowns-tracker");
    assert_eq!(body["store"], "reachable");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());
    store.set_fail_reads(true);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"], "unreachable");
}

#[tokio::test]
async fn test_buildinfo() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    let request = Request::builder().uri("/api/buildinfo").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["build_profile"].is_string());
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    let request = Request::builder()
        .uri("/monsters/rathalos.png")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_identity() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    for uri in ["/api/collection", "/api/export", "/api/carousel", "/api/friends"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);

        let body = extract_json(response.into_body()).await;
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_first_request_seeds_from_template() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());

    let response = app
        .oneshot(user_request("GET", "/api/collection", "ana", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["file_name"], "template.csv");
    assert_eq!(body["degraded"], false);
    assert_eq!(body["summary"], json!({"total": 2, "small": 0, "large": 0, "both": 0}));
    assert_eq!(body["records"][0]["id"], "Rathalos__0");
    assert_eq!(body["records"][0]["image"], "/monsters/rathalos.png");
    assert_eq!(body["records"][1]["image"], "/monster-placeholder.png");
    assert_eq!(body["records"][1]["status"], "missing");

    let doc = store.load_document("ana", Namespace::Private).await.unwrap().unwrap();
    assert_eq!(doc.rows.len(), 2);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_filters_and_pages() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());
    assert_eq!(import(&app, "ana", TABLE, "coronas.csv").await.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/collection?q=%20DIA%20", "ana", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_matches"], 1);
    assert_eq!(body["records"][0]["name"], "Diablos");
    // Summary always covers the whole collection
    assert_eq!(body["summary"]["total"], 2);

    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/collection?page=7", "ana", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);
}

#[tokio::test]
async fn test_dashboard_only_missing_hides_complete() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());
    import(&app, "ana", TABLE, "coronas.csv").await;

    for crown in ["small", "large"] {
        let toggle = json_request("POST", "/api/records/Rathalos__0/toggle", "ana", json!({"crown": crown}));
        assert_eq!(app.clone().oneshot(toggle).await.unwrap().status(), StatusCode::OK);
    }

    let response = app
        .oneshot(user_request("GET", "/api/collection?only_missing=true", "ana", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_matches"], 1);
    assert_eq!(body["records"][0]["name"], "Diablos");
    assert_eq!(body["summary"]["both"], 1);
}

#[tokio::test]
async fn test_dashboard_degrades_when_store_unreadable() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());
    import(&app, "ana", TABLE, "coronas.csv").await;
    store.set_fail_reads(true);

    let response = app
        .oneshot(user_request("GET", "/api/collection", "ana", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["degraded"], true);
    assert_eq!(body["summary"]["total"], 0);
    assert_eq!(body["records"], json!([]));
}

// =============================================================================
// Import
// =============================================================================

#[tokio::test]
async fn test_import_reports_reconciliation() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    // The seeded template already knows Rathalos; Diablos is new, Kirin is dropped
    let response = import(&app, "ana", TABLE, "coronas.csv").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["file_name"], "coronas.csv");
    assert_eq!(body["total"], 2);
    assert_eq!(body["matched"], 1);
    assert_eq!(body["added"], 1);
    assert_eq!(body["dropped"], 1);
    // Seeded progress wins over the imported flag
    assert_eq!(body["summary"], json!({"total": 2, "small": 0, "large": 0, "both": 0}));
}

#[tokio::test]
async fn test_malformed_import_is_rejected_without_changes() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());
    import(&app, "ana", TABLE, "coronas.csv").await;

    let response = import(&app, "ana", b"Nombre;Otra\nRathalos;1\n", "bad.csv").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("Monstruo"));

    let doc = store.load_document("ana", Namespace::Private).await.unwrap().unwrap();
    assert_eq!(doc.file_name, "coronas.csv");
    assert_eq!(doc.rows.len(), 2);
}

#[tokio::test]
async fn test_import_fails_when_store_unreadable() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());
    store.set_fail_reads(true);

    let response = import(&app, "ana", TABLE, "coronas.csv").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Toggle and export
// =============================================================================

#[tokio::test]
async fn test_toggle_flips_and_persists() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());
    import(&app, "ana", TABLE, "coronas.csv").await;

    let request = json_request("POST", "/api/records/Diablos__1/toggle", "ana", json!({"crown": "small"}));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["small"], true);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["status_label"], "Parcial");

    let doc = store.load_document("ana", Namespace::Private).await.unwrap().unwrap();
    assert!(doc.rows.find("Diablos__1").unwrap().small);
}

#[tokio::test]
async fn test_toggle_unknown_record_is_not_found() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    let request = json_request("POST", "/api/records/Nope__9/toggle", "ana", json!({"crown": "small"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_downloads_table() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());
    import(&app, "ana", TABLE, "Mis%20Coronas.csv").await;

    let response = app
        .oneshot(user_request("GET", "/api/export", "ana", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("filename=\"Mis Coronas_actualizado.csv\""));

    let text = extract_text(response.into_body()).await;
    assert_eq!(
        text,
        "Monstruo;Corona Pequeña;Corona Grande\nRathalos;0;0\nDiablos;0;0"
    );
}

// =============================================================================
// Carousels and publishing
// =============================================================================

#[tokio::test]
async fn test_owner_carousel_wraps_and_resets() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());

    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/carousel?index=1", "ana", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["index"], 1);
    assert_eq!(body["next"], 0);
    assert_eq!(body["record"]["name"], "Kirin");

    let response = app
        .oneshot(user_request("GET", "/api/carousel?index=40", "ana", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["index"], 0);
    assert_eq!(body["record"]["name"], "Rathalos");
}

#[tokio::test]
async fn test_publish_and_browse_friend() {
    let assets = setup_assets();
    let (_, app) = setup_memory_app(assets.path());
    import(&app, "ana", TABLE, "coronas.csv").await;

    // Not yet published
    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/friends/ana", "bo", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["state"], "unavailable");

    let request = json_request("PUT", "/api/profile/public", "ana", json!({"is_public": true}));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["is_public"], true);
    assert_eq!(body["display_name"], "User ana");

    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/friends", "bo", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["friends"][0]["uid"], "ana");
    assert_eq!(body["friends"][0]["photo_url"], "/monster-placeholder.png");

    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/friends/ana?index=1", "bo", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "available");
    assert_eq!(body["owner"]["display_name"], "User ana");
    assert_eq!(body["carousel"]["record"]["name"], "Diablos");
    assert_eq!(body["carousel"]["total"], 2);

    // Later toggles reach the mirror
    let request = json_request("POST", "/api/records/Diablos__1/toggle", "ana", json!({"crown": "large"}));
    app.clone().oneshot(request).await.unwrap();
    let response = app
        .clone()
        .oneshot(user_request("GET", "/api/friends/ana?index=1", "bo", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["carousel"]["record"]["large"], true);

    // Hiding makes the collection unavailable again
    let request = json_request("PUT", "/api/profile/public", "ana", json!({"is_public": false}));
    app.clone().oneshot(request).await.unwrap();
    let response = app
        .oneshot(user_request("GET", "/api/friends/ana", "bo", Body::empty()))
        .await
        .unwrap();
    assert_eq!(extract_json(response.into_body()).await["state"], "unavailable");
}

#[tokio::test]
async fn test_published_without_rows_is_empty_state() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());

    let request = json_request("PUT", "/api/profile/public", "ana", json!({"is_public": true}));
    app.clone().oneshot(request).await.unwrap();
    store
        .insert_raw("ana", Namespace::Public, json!({"rows": "corrupted"}))
        .await;

    let response = app
        .oneshot(user_request("GET", "/api/friends/ana", "bo", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "empty");
    assert_eq!(body["owner"]["uid"], "ana");
}

#[tokio::test]
async fn test_failed_mirror_reports_error_but_keeps_private_copy() {
    let assets = setup_assets();
    let (store, app) = setup_memory_app(assets.path());

    let request = json_request("PUT", "/api/profile/public", "ana", json!({"is_public": true}));
    app.clone().oneshot(request).await.unwrap();
    store.set_fail_public_writes(true);

    let request = json_request("POST", "/api/records/Kirin__1/toggle", "ana", json!({"crown": "small"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let private = store.load_document("ana", Namespace::Private).await.unwrap().unwrap();
    assert!(private.rows.find("Kirin__1").unwrap().small);
    let public = store.load_document("ana", Namespace::Public).await.unwrap().unwrap();
    assert!(!public.rows.find("Kirin__1").unwrap().small);
}

// =============================================================================
// SQLite-backed store
// =============================================================================

#[tokio::test]
async fn test_round_trip_through_sqlite_store() {
    let assets = setup_assets();
    let store = Arc::new(SqliteStore::in_memory().await.expect("Should open database"));
    let app = setup_app(store, assets.path());

    assert_eq!(import(&app, "ana", TABLE, "coronas.csv").await.status(), StatusCode::OK);

    let request = json_request("POST", "/api/records/Diablos__1/toggle", "ana", json!({"crown": "large"}));
    assert_eq!(app.clone().oneshot(request).await.unwrap().status(), StatusCode::OK);

    let response = app
        .oneshot(user_request("GET", "/api/export", "ana", Body::empty()))
        .await
        .unwrap();
    let text = extract_text(response.into_body()).await;
    assert!(text.ends_with("Rathalos;0;0\nDiablos;0;1"));
}
