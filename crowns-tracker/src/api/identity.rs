//! Identity extraction for protected routes
//!
//! The identity proxy in front of the tracker authenticates the user and
//! forwards who they are in request headers. Only the uid is required.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use crowns_common::Identity;
use tracing::{debug, warn};

use super::ApiError;
use crate::AppState;

pub const UID_HEADER: &str = "x-auth-uid";
pub const NAME_HEADER: &str = "x-auth-name";
pub const EMAIL_HEADER: &str = "x-auth-email";
pub const PHOTO_HEADER: &str = "x-auth-photo";

/// Read the forwarded identity, if any
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let header = |name: &str| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
            .unwrap_or_default()
    };

    let uid = header(UID_HEADER);
    if uid.is_empty() {
        return None;
    }

    Some(
        Identity::new(uid)
            .with_display_name(header(NAME_HEADER))
            .with_email(header(EMAIL_HEADER))
            .with_photo_url(header(PHOTO_HEADER)),
    )
}

/// Identity middleware
///
/// Rejects requests without a uid with 401. On a user's first request
/// their collection is created before the handler runs.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = identity_from_headers(request.headers()).ok_or(ApiError::Unauthorized)?;
    debug!(uid = identity.uid.as_str(), path = %request.uri().path(), "Authenticated request");

    if let Err(e) = state.tracker.ensure_user_document(&identity.uid).await {
        warn!("Could not prepare collection for {}: {}", identity.uid, e);
    }

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
