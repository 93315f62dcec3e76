//! Handlers for `/sessions/{id}` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sessions/{id}/roster` | 404 if the session is unknown |
//! | `GET`  | `/sessions/{id}/marks?date=<day>` | |
//! | `POST` | `/sessions/{id}/marks` | Body: `{"student_id","status","date"}`; 409 once locked |
//! | `POST` | `/sessions/{id}/submit` | Body: `{"date"}`; 409 if locked or incomplete |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use rollcall_core::{
  gateway::SyncGateway,
  mark::{RemoteMark, Status},
  roster::{RosterEntry, StudentId},
  session::SessionId,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─── Roster ──────────────────────────────────────────────────────────────────

/// `GET /sessions/{id}/roster`
pub async fn roster<G: SyncGateway>(
  State(gateway): State<Arc<G>>,
  Path(id): Path<SessionId>,
) -> Result<Json<Vec<RosterEntry>>> {
  Ok(Json(gateway.fetch_roster(id).await?))
}

// ─── Marks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MarksParams {
  pub date: NaiveDate,
}

/// `GET /sessions/{id}/marks?date=<day>`
pub async fn marks<G: SyncGateway>(
  State(gateway): State<Arc<G>>,
  Path(id): Path<SessionId>,
  Query(params): Query<MarksParams>,
) -> Result<Json<Vec<RemoteMark>>> {
  Ok(Json(gateway.fetch_marks(id, params.date).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkBody {
  pub student_id: StudentId,
  pub status:     Status,
  pub date:       NaiveDate,
}

/// `POST /sessions/{id}/marks`
pub async fn record<G: SyncGateway>(
  State(gateway): State<Arc<G>>,
  Path(id): Path<SessionId>,
  Json(body): Json<MarkBody>,
) -> Result<StatusCode> {
  gateway
    .persist_mark(id, body.student_id, body.status, body.date)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitBody {
  pub date: NaiveDate,
}

/// `POST /sessions/{id}/submit`
pub async fn submit<G: SyncGateway>(
  State(gateway): State<Arc<G>>,
  Path(id): Path<SessionId>,
  Json(body): Json<SubmitBody>,
) -> Result<StatusCode> {
  gateway.submit_session(id, body.date).await?;
  Ok(StatusCode::NO_CONTENT)
}
