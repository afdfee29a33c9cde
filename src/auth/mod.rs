//! Request authentication and throttling

pub mod rate_limit;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// Shared-secret check for admin endpoints (`x-admin-key` header).
///
/// Deliberately dumb: the admin surface is an internal tool, not the core
/// state machine. An empty configured key refuses everything.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided = request
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if state.admin_key.is_empty() || provided != state.admin_key {
        tracing::warn!("Admin request rejected: bad or missing x-admin-key");
        return Err(ApiError::new(ErrorCode::Unauthorized).into_response());
    }

    Ok(next.run(request).await)
}
