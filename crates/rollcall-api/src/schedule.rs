//! Handler for `GET /schedule`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use rollcall_core::{
  gateway::SyncGateway,
  session::{ActorId, Session},
};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
  pub actor_id: ActorId,
  /// `YYYY-MM-DD`.
  pub date:     NaiveDate,
}

/// `GET /schedule?actor_id=<id>&date=<day>`
pub async fn list<G: SyncGateway>(
  State(gateway): State<Arc<G>>,
  Query(params): Query<ScheduleParams>,
) -> Result<Json<Vec<Session>>> {
  let sessions = gateway
    .fetch_schedule(params.actor_id, params.date)
    .await?;
  Ok(Json(sessions))
}
