//! Directory of published collections and read-only browsing

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::views::{CarouselView, FriendView};
use super::ApiError;
use crate::pagination::{calculate_pagination, DIRECTORY_PAGE_SIZE};
use crate::service::PublicView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FriendsQuery {
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub friends: Vec<FriendView>,
}

/// GET /api/friends
///
/// Published profiles ordered by display name.
pub async fn list_friends(
    State(state): State<AppState>,
    Query(query): Query<FriendsQuery>,
) -> Result<Json<FriendsResponse>, ApiError> {
    let entries = state.tracker.list_public().await?;
    let pagination = calculate_pagination(entries.len(), DIRECTORY_PAGE_SIZE, query.page);

    Ok(Json(FriendsResponse {
        total: entries.len(),
        page: pagination.page,
        total_pages: pagination.total_pages,
        friends: pagination
            .slice(&entries)
            .iter()
            .map(|entry| FriendView::new(&entry.uid, &entry.profile))
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FriendQuery {
    #[serde(default)]
    pub index: usize,
}

/// Another user's collection as seen by the caller
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FriendResponse {
    /// Unknown user or collection not published
    Unavailable,
    Empty {
        owner: FriendView,
    },
    Available {
        owner: FriendView,
        carousel: CarouselView,
    },
}

/// GET /api/friends/:uid
pub async fn get_friend(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(query): Query<FriendQuery>,
) -> Result<Json<FriendResponse>, ApiError> {
    let response = match state.tracker.public_view(&uid).await? {
        PublicView::Unavailable => FriendResponse::Unavailable,
        PublicView::Empty { profile } => FriendResponse::Empty {
            owner: FriendView::new(&uid, &profile),
        },
        PublicView::Available { profile, rows } => FriendResponse::Available {
            owner: FriendView::new(&uid, &profile),
            carousel: CarouselView::new(&rows, query.index, &state.assets_path),
        },
    };
    Ok(Json(response))
}
