//! Attendance statistics derived from committed records.
//!
//! Everything here is a pure function of its input. Callers fetch the records
//! for one student, aggregate them for the current view, and throw the result
//! away afterwards.

use std::{
  collections::{BTreeMap, HashMap},
  fmt,
};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{record::AttendanceRecord, session::SubjectId};

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Attended/total counts over some scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregate {
  pub total_sessions: u32,
  pub present_count:  u32,
  /// `None` when `total_sessions` is zero.
  pub percentage:     Option<u8>,
}

impl Aggregate {
  pub fn from_counts(total_sessions: u32, present_count: u32) -> Self {
    let percentage = (total_sessions > 0).then(|| {
      (f64::from(present_count) / f64::from(total_sessions) * 100.0).round()
        as u8
    });
    Self { total_sessions, present_count, percentage }
  }

  fn push(&mut self, attended: bool) {
    self.total_sessions += 1;
    if attended {
      self.present_count += 1;
    }
  }

  fn finish(self) -> Self {
    Self::from_counts(self.total_sessions, self.present_count)
  }

  /// The percentage as displayed: an empty scope shows as 0%.
  pub fn display_percentage(&self) -> u8 { self.percentage.unwrap_or(0) }

  /// Band of the displayed percentage.
  pub fn band(&self) -> Band { classify(self.display_percentage()) }
}

// ─── Bands ───────────────────────────────────────────────────────────────────

/// Qualitative label for an attendance percentage.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
)]
pub enum Band {
  Poor,
  Average,
  Good,
  Excellent,
}

/// Map a percentage to its band. Each band includes its lower bound.
pub fn classify(percentage: u8) -> Band {
  match percentage {
    85.. => Band::Excellent,
    75.. => Band::Good,
    65.. => Band::Average,
    _ => Band::Poor,
  }
}

// ─── Grouping keys ───────────────────────────────────────────────────────────

/// A calendar month; orders chronologically.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MonthKey {
  pub year:  i32,
  pub month: u32,
}

impl MonthKey {
  pub fn of(date: NaiveDate) -> Self {
    Self { year: date.year(), month: date.month() }
  }

  /// Three-letter month name, e.g. `Jul`.
  pub fn short_name(&self) -> &'static str {
    const NAMES: [&str; 12] = [
      "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct",
      "Nov", "Dec",
    ];
    self
      .month
      .checked_sub(1)
      .and_then(|i| NAMES.get(i as usize))
      .copied()
      .unwrap_or("???")
  }
}

impl fmt::Display for MonthKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.short_name(), self.year)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
  pub month:     MonthKey,
  pub aggregate: Aggregate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAggregate {
  pub subject_id:   SubjectId,
  pub subject_name: String,
  pub aggregate:    Aggregate,
}

// ─── Computation ─────────────────────────────────────────────────────────────

/// One aggregate over every record.
pub fn compute_overall(records: &[AttendanceRecord]) -> Aggregate {
  records
    .iter()
    .fold(Aggregate::default(), |mut acc, r| {
      acc.push(r.attended());
      acc
    })
    .finish()
}

/// One aggregate per calendar month, oldest month first.
pub fn compute_monthly(records: &[AttendanceRecord]) -> Vec<MonthlyAggregate> {
  let mut months: BTreeMap<MonthKey, Aggregate> = BTreeMap::new();
  for record in records {
    months
      .entry(MonthKey::of(record.date))
      .or_default()
      .push(record.attended());
  }
  months
    .into_iter()
    .map(|(month, acc)| MonthlyAggregate { month, aggregate: acc.finish() })
    .collect()
}

/// One aggregate per subject, in the order each subject first appears in
/// `records`.
pub fn compute_by_subject(records: &[AttendanceRecord]) -> Vec<SubjectAggregate> {
  let mut index: HashMap<&SubjectId, usize> = HashMap::new();
  let mut groups: Vec<SubjectAggregate> = Vec::new();

  for record in records {
    let slot = *index.entry(&record.subject_id).or_insert_with(|| {
      groups.push(SubjectAggregate {
        subject_id:   record.subject_id.clone(),
        subject_name: record.subject_name.clone(),
        aggregate:    Aggregate::default(),
      });
      groups.len() - 1
    });
    groups[slot].aggregate.push(record.attended());
  }

  for group in &mut groups {
    group.aggregate = group.aggregate.finish();
  }
  groups
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mark::Status;

  fn record(subject: &str, y: i32, m: u32, d: u32, status: Status) -> AttendanceRecord {
    AttendanceRecord {
      session_id:   format!("{subject}-{y}{m:02}{d:02}").into(),
      subject_id:   subject.into(),
      subject_name: subject.to_uppercase(),
      date:         NaiveDate::from_ymd_opt(y, m, d).unwrap(),
      status,
    }
  }

  #[test]
  fn band_boundaries_belong_to_the_higher_band() {
    assert_eq!(classify(84), Band::Good);
    assert_eq!(classify(85), Band::Excellent);
    assert_eq!(classify(75), Band::Good);
    assert_eq!(classify(74), Band::Average);
    assert_eq!(classify(65), Band::Average);
    assert_eq!(classify(64), Band::Poor);
    assert_eq!(classify(0), Band::Poor);
    assert_eq!(classify(100), Band::Excellent);
  }

  #[test]
  fn monthly_groups_are_chronological() {
    let records = [
      record("os", 2025, 7, 1, Status::Present),
      record("os", 2025, 7, 2, Status::Absent),
      record("os", 2025, 8, 1, Status::Present),
    ];
    let months = compute_monthly(&records);

    assert_eq!(months.len(), 2);
    assert_eq!(months[0].month.short_name(), "Jul");
    assert_eq!(months[0].aggregate, Aggregate {
      total_sessions: 2,
      present_count:  1,
      percentage:     Some(50),
    });
    assert_eq!(months[1].month.short_name(), "Aug");
    assert_eq!(months[1].aggregate.percentage, Some(100));
  }

  #[test]
  fn monthly_order_ignores_input_order() {
    let records = [
      record("os", 2025, 9, 3, Status::Present),
      record("os", 2024, 12, 3, Status::Absent),
      record("os", 2025, 1, 3, Status::Present),
    ];
    let labels: Vec<_> = compute_monthly(&records)
      .iter()
      .map(|m| m.month.to_string())
      .collect();
    assert_eq!(labels, ["Dec 2024", "Jan 2025", "Sep 2025"]);
  }

  #[test]
  fn subjects_keep_first_occurrence_order() {
    let records = [
      record("os", 2025, 7, 1, Status::Present),
      record("cn", 2025, 7, 1, Status::Absent),
      record("ai", 2025, 7, 2, Status::Late),
      record("cn", 2025, 7, 3, Status::Present),
    ];
    let subjects = compute_by_subject(&records);
    let ids: Vec<_> = subjects.iter().map(|s| s.subject_id.0.as_str()).collect();
    assert_eq!(ids, ["os", "cn", "ai"]);
    assert_eq!(subjects[1].aggregate.total_sessions, 2);
    assert_eq!(subjects[1].aggregate.percentage, Some(50));
    assert_eq!(subjects[2].aggregate.percentage, Some(100));
  }

  #[test]
  fn overall_rounds_to_nearest() {
    let records = [
      record("os", 2025, 7, 1, Status::Present),
      record("os", 2025, 7, 2, Status::Present),
      record("os", 2025, 7, 3, Status::Absent),
    ];
    let overall = compute_overall(&records);
    assert_eq!(overall.total_sessions, 3);
    assert_eq!(overall.present_count, 2);
    assert_eq!(overall.percentage, Some(67));
    assert_eq!(overall.band(), Band::Average);
  }

  #[test]
  fn empty_scope_has_no_percentage() {
    let overall = compute_overall(&[]);
    assert_eq!(overall.total_sessions, 0);
    assert_eq!(overall.percentage, None);
    assert_eq!(overall.display_percentage(), 0);
    assert!(compute_monthly(&[]).is_empty());
    assert!(compute_by_subject(&[]).is_empty());
  }
}
