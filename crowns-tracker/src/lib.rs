//! crowns-tracker library - HTTP service for crown collections
//!
//! Owners import, toggle and export their checklist; published collections
//! are browsable read-only by other signed-in users. Identity comes from
//! headers set by the fronting identity proxy.

use axum::Router;
use std::path::PathBuf;

pub mod api;
pub mod pagination;
pub mod service;

pub use service::Tracker;

/// Largest accepted import body
pub const IMPORT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub tracker: Tracker,
    /// Static files, including `monsters/<slug>.png` artwork
    pub assets_path: PathBuf,
}

impl AppState {
    pub fn new(tracker: Tracker, assets_path: PathBuf) -> Self {
        Self {
            tracker,
            assets_path,
        }
    }
}

/// Build application router
///
/// `/health` and static assets need no identity; everything under `/api`
/// except build info requires one.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post, put};
    use tower_http::services::ServeDir;
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        .route("/api/collection", get(api::get_collection))
        .route(
            "/api/import",
            post(api::import_collection).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/api/records/:id/toggle", post(api::toggle_record))
        .route("/api/export", get(api::export_collection))
        .route("/api/carousel", get(api::get_carousel))
        .route("/api/profile/public", put(api::set_public))
        .route("/api/friends", get(api::list_friends))
        .route("/api/friends/:uid", get(api::get_friend))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::identity_middleware,
        ));

    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    let assets = ServeDir::new(&state.assets_path);

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
