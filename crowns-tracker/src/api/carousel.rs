//! Owner carousel: one record at a time

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use crowns_common::Identity;
use serde::Deserialize;

use super::views::CarouselView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CarouselQuery {
    #[serde(default)]
    pub index: usize,
}

/// GET /api/carousel
///
/// An index past the end of the collection starts over at the first record.
pub async fn get_carousel(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<CarouselQuery>,
) -> Json<CarouselView> {
    let loaded = state.tracker.load_for_display(&identity.uid).await;
    Json(CarouselView::new(
        &loaded.document.rows,
        query.index,
        &state.assets_path,
    ))
}
