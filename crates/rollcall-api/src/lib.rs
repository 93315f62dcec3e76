//! JSON REST API for rollcall.
//!
//! Exposes an axum [`Router`] backed by any [`SyncGateway`]. The gateway
//! enforces locking and completeness; this layer only translates requests and
//! maps [`GatewayError`](rollcall_core::gateway::GatewayError)s onto HTTP
//! statuses.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(store.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod schedule;
pub mod sessions;
pub mod students;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  middleware,
  routing::{get, post},
};
use rollcall_core::gateway::SyncGateway;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROLLCALL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// When set, every request must carry `Authorization: Bearer <api_token>`.
  #[serde(default)]
  pub api_token:  Option<String>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 5240 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/rollcall/rollcall.db") }

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `gateway`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<G>(gateway: Arc<G>) -> Router<()>
where
  G: SyncGateway + 'static,
{
  Router::new()
    .route("/schedule", get(schedule::list::<G>))
    .route("/sessions/{id}/roster", get(sessions::roster::<G>))
    .route(
      "/sessions/{id}/marks",
      get(sessions::marks::<G>).post(sessions::record::<G>),
    )
    .route("/sessions/{id}/submit", post(sessions::submit::<G>))
    .route("/students/{id}/records", get(students::records::<G>))
    .with_state(gateway)
}

/// The full application: the API under `/api`, an optional bearer-token
/// check, and request tracing.
pub fn app<G>(gateway: Arc<G>, api_token: Option<&str>) -> Router
where
  G: SyncGateway + 'static,
{
  let mut api = api_router(gateway);
  if let Some(token) = api_token {
    let token: Arc<str> = Arc::from(token);
    api = api.layer(middleware::from_fn_with_state(token, auth::require_bearer));
  }
  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
