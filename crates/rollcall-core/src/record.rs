//! Committed attendance history, as consumed by the aggregation functions.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  mark::Status,
  session::{SessionId, SubjectId},
};

/// One committed mark of one student, joined with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub session_id:   SessionId,
  pub subject_id:   SubjectId,
  pub subject_name: String,
  pub date:         NaiveDate,
  pub status:       Status,
}

impl AttendanceRecord {
  pub fn attended(&self) -> bool { self.status.attended() }
}

/// Which slice of a student's history to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordScope {
  #[default]
  All,
  Month { year: i32, month: u32 },
  Subject(SubjectId),
}

impl RecordScope {
  pub fn includes(&self, record: &AttendanceRecord) -> bool {
    match self {
      Self::All => true,
      Self::Month { year, month } => {
        record.date.year() == *year && record.date.month() == *month
      }
      Self::Subject(id) => &record.subject_id == id,
    }
  }
}
