//! Handler for `GET /students/{id}/records`.
//!
//! The record scope is spelled as query parameters: none for the full
//! history, `year` + `month` for one calendar month, or `subject_id` for one
//! subject. Mixing the two forms is a bad request.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use rollcall_core::{
  gateway::SyncGateway,
  record::{AttendanceRecord, RecordScope},
  roster::StudentId,
  session::SubjectId,
};
use serde::Deserialize;

use crate::error::{ApiError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct RecordsParams {
  pub year:       Option<i32>,
  pub month:      Option<u32>,
  pub subject_id: Option<SubjectId>,
}

impl RecordsParams {
  pub fn into_scope(self) -> Result<RecordScope> {
    match (self.year, self.month, self.subject_id) {
      (None, None, None) => Ok(RecordScope::All),
      (Some(year), Some(month), None) if (1..=12).contains(&month) => {
        Ok(RecordScope::Month { year, month })
      }
      (None, None, Some(subject)) => Ok(RecordScope::Subject(subject)),
      _ => Err(ApiError::BadRequest(
        "scope is either year+month (1-12) or subject_id".into(),
      )),
    }
  }
}

/// `GET /students/{id}/records[?year=<y>&month=<m>|?subject_id=<s>]`
pub async fn records<G: SyncGateway>(
  State(gateway): State<Arc<G>>,
  Path(id): Path<StudentId>,
  Query(params): Query<RecordsParams>,
) -> Result<Json<Vec<AttendanceRecord>>> {
  let scope = params.into_scope()?;
  Ok(Json(gateway.fetch_student_records(id, scope).await?))
}
