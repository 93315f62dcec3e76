//! Bearer-token check applied in front of every API route.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};

use crate::error::ApiError;

/// Verify `Authorization: Bearer <token>` against the configured token.
pub fn verify_bearer(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
  let presented = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(ApiError::Unauthorized)?;

  if presented.trim() != expected {
    return Err(ApiError::Unauthorized);
  }
  Ok(())
}

/// Middleware for [`axum::middleware::from_fn_with_state`].
pub async fn require_bearer(
  State(token): State<Arc<str>>,
  req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  verify_bearer(req.headers(), &token)?;
  Ok(next.run(req).await)
}
