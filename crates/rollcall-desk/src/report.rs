//! A student's attendance statistics, as shown on their dashboard.

use rollcall_core::{
  aggregate::{
    Aggregate, Band, MonthlyAggregate, SubjectAggregate, compute_by_subject,
    compute_monthly, compute_overall,
  },
  record::AttendanceRecord,
};
use serde::Serialize;

/// Overall, monthly and subject-wise aggregates over one student's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceReport {
  pub overall:    Aggregate,
  pub band:       Band,
  pub monthly:    Vec<MonthlyAggregate>,
  pub by_subject: Vec<SubjectAggregate>,
}

impl AttendanceReport {
  pub fn from_records(records: &[AttendanceRecord]) -> Self {
    let overall = compute_overall(records);
    Self {
      overall,
      band: overall.band(),
      monthly: compute_monthly(records),
      by_subject: compute_by_subject(records),
    }
  }
}
