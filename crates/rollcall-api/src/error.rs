//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rollcall_core::gateway::{GatewayError, RejectReason};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("missing or invalid bearer token")]
  Unauthorized,

  #[error(transparent)]
  Gateway(#[from] GatewayError),
}

impl ApiError {
  /// HTTP status and machine-readable reason for this error.
  ///
  /// `reason` is `None` only for [`GatewayError::Unavailable`]; clients treat
  /// any 5xx as transient regardless of the body.
  pub fn classify(&self) -> (StatusCode, Option<RejectReason>) {
    match self {
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, Some(RejectReason::Invalid)),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, Some(RejectReason::Unauthorized)),
      ApiError::Gateway(GatewayError::Unavailable(_)) => (StatusCode::SERVICE_UNAVAILABLE, None),
      ApiError::Gateway(GatewayError::Rejected(r)) => {
        let status = match r.reason {
          RejectReason::AlreadyLocked | RejectReason::Incomplete => StatusCode::CONFLICT,
          RejectReason::NotFound => StatusCode::NOT_FOUND,
          RejectReason::Unauthorized => StatusCode::UNAUTHORIZED,
          RejectReason::Invalid => StatusCode::BAD_REQUEST,
        };
        (status, Some(r.reason))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, reason) = self.classify();
    if status.is_server_error() {
      tracing::error!(error = %self, "gateway unavailable");
    }
    let message = match &self {
      ApiError::Gateway(GatewayError::Rejected(r)) => r.message.clone(),
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message, "reason": reason }))).into_response()
  }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use rollcall_core::{gateway::Rejection, session::SessionId};

  use super::*;

  #[test]
  fn lock_and_incomplete_are_conflicts() {
    let locked = ApiError::from(GatewayError::Rejected(Rejection::already_locked(
      &SessionId::from("s1"),
    )));
    assert_eq!(
      locked.classify(),
      (StatusCode::CONFLICT, Some(RejectReason::AlreadyLocked))
    );

    let incomplete =
      ApiError::from(GatewayError::rejected(RejectReason::Incomplete, "2 unmarked"));
    assert_eq!(incomplete.classify().0, StatusCode::CONFLICT);
  }

  #[test]
  fn unavailable_is_503_without_reason() {
    let err = ApiError::from(GatewayError::Unavailable("disk full".into()));
    assert_eq!(err.classify(), (StatusCode::SERVICE_UNAVAILABLE, None));
  }
}
