//! Publishing toggle

use axum::{extract::State, Extension, Json};
use crowns_common::store::PublicProfile;
use crowns_common::Identity;
use serde::Deserialize;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PublicRequest {
    pub is_public: bool,
}

/// PUT /api/profile/public
///
/// Stores the caller's identity fields with the new flag. Enabling also
/// publishes the current collection.
pub async fn set_public(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<PublicRequest>,
) -> Result<Json<PublicProfile>, ApiError> {
    let profile = state
        .tracker
        .set_public(&identity, request.is_public)
        .await?;
    Ok(Json(profile))
}
