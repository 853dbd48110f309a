//! Owner collection endpoints: dashboard, import, toggle, export

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use crowns_common::csv_codec::TextEncoding;
use crowns_common::progress::{filter, summarize, Summary};
use crowns_common::reconcile::ImportReport;
use crowns_common::{Crown, Identity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::views::RecordView;
use super::ApiError;
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;

/// Query parameters for the dashboard
#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    /// Name search text
    #[serde(default)]
    pub q: String,
    /// Hide records that have both crowns
    #[serde(default)]
    pub only_missing: bool,
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub file_name: String,
    pub is_public: bool,
    /// Stored collection could not be read; an empty one is shown instead
    pub degraded: bool,
    pub summary: Summary,
    pub total_matches: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub records: Vec<RecordView>,
}

/// GET /api/collection
pub async fn get_collection(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<CollectionQuery>,
) -> Json<CollectionResponse> {
    let loaded = state.tracker.load_for_display(&identity.uid).await;
    let is_public = state.tracker.is_public(&identity.uid).await;
    let rows = &loaded.document.rows;

    let matches = filter(rows, &query.q, query.only_missing);
    let pagination = calculate_pagination(matches.len(), PAGE_SIZE, query.page);
    let records = pagination
        .slice(&matches)
        .iter()
        .map(|record| RecordView::new(record, &state.assets_path))
        .collect();

    Json(CollectionResponse {
        file_name: loaded.document.file_name.clone(),
        is_public,
        degraded: loaded.degraded,
        summary: summarize(rows),
        total_matches: matches.len(),
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages,
        records,
    })
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Name of the uploaded file, kept for export naming
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub encoding: TextEncoding,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub file_name: String,
    #[serde(flatten)]
    pub report: ImportReport,
    pub summary: Summary,
}

/// POST /api/import
///
/// Body is the raw table. A table that cannot be decoded is rejected with
/// 422 and the stored collection is left untouched.
pub async fn import_collection(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResponse>, ApiError> {
    debug!(uid = identity.uid.as_str(), bytes = body.len(), "Import upload received");

    let outcome = state
        .tracker
        .import(&identity.uid, &body, query.file_name.trim(), query.encoding)
        .await?;

    Ok(Json(ImportResponse {
        summary: summarize(&outcome.document.rows),
        file_name: outcome.document.file_name,
        report: outcome.report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub crown: Crown,
}

/// POST /api/records/:id/toggle
pub async fn toggle_record(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<RecordView>, ApiError> {
    let record = state
        .tracker
        .toggle(&identity.uid, &id, request.crown)
        .await?;
    Ok(Json(RecordView::new(&record, &state.assets_path)))
}

/// GET /api/export
///
/// Downloads the collection as a table named after the last import.
pub async fn export_collection(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let (file_name, body) = state.tracker.export(&identity.uid).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
        ],
        body,
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// name percent-encoded
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let encoded: String = file_name
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
                char::from(b).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect();

    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}
