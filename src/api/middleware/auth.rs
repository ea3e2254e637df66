use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::{api::state::AppState, error::AppError};

/// Header naming the staff member acting through the admin token. Recorded
/// on refunds and proof reviews.
pub const ADMIN_NAME_HEADER: &str = "x-admin-name";

#[derive(Clone)]
pub struct CurrentAdmin {
    pub name: String,
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // No token configured means the admin surface is closed
    let expected = state
        .settings
        .admin
        .api_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("Rejected admin request with invalid token");
        return Err(AppError::Unauthorized);
    }

    let name = request
        .headers()
        .get(ADMIN_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("admin")
        .to_string();

    request.extensions_mut().insert(CurrentAdmin { name });

    Ok(next.run(request).await)
}
