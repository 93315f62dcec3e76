//! Session selection and per-session lock state.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rollcall_core::{
  Error, Result,
  session::{Schedule, Session, SessionId},
};
use serde::Serialize;

// ─── Lock state ──────────────────────────────────────────────────────────────

/// Lock state of one session. `Locked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
  #[default]
  Open,
  Locked,
}

/// Append-only set of locked sessions, keyed by session id.
///
/// An entry is only ever removed by [`LockTable::roll_over`], once its session
/// date falls outside the retention window. Sessions that old are never on
/// the current schedule, so eviction cannot reopen a selectable session.
#[derive(Debug, Clone)]
pub struct LockTable {
  retention_days: u64,
  locked:         HashMap<SessionId, NaiveDate>,
}

impl LockTable {
  pub fn new(retention_days: u32) -> Self {
    Self { retention_days: u64::from(retention_days), locked: HashMap::new() }
  }

  pub fn state(&self, id: &SessionId) -> LockState {
    if self.locked.contains_key(id) {
      LockState::Locked
    } else {
      LockState::Open
    }
  }

  /// Idempotent. Returns `true` if the session was open until now.
  pub fn lock(&mut self, id: &SessionId, date: NaiveDate) -> bool {
    if self.locked.contains_key(id) {
      return false;
    }
    self.locked.insert(id.clone(), date);
    true
  }

  /// Forget sessions dated more than `retention_days` before `today`.
  pub fn roll_over(&mut self, today: NaiveDate) {
    let cutoff = today
      .checked_sub_days(Days::new(self.retention_days))
      .unwrap_or(NaiveDate::MIN);
    self.locked.retain(|_, date| *date >= cutoff);
  }

  pub fn len(&self) -> usize { self.locked.len() }

  pub fn is_empty(&self) -> bool { self.locked.is_empty() }
}

// ─── Selector ────────────────────────────────────────────────────────────────

/// Tracks today's schedule, the selected session, and which sessions are
/// locked.
#[derive(Debug, Clone)]
pub struct SessionSelector {
  today:    NaiveDate,
  schedule: Schedule,
  selected: Option<SessionId>,
  locks:    LockTable,
}

impl SessionSelector {
  pub fn new(today: NaiveDate, retention_days: u32) -> Self {
    Self {
      today,
      schedule: Schedule::default(),
      selected: None,
      locks: LockTable::new(retention_days),
    }
  }

  pub fn schedule(&self) -> &Schedule { &self.schedule }

  /// Replace the schedule for `date`, evicting stale lock entries.
  ///
  /// Returns `true` if the previous selection is no longer on the schedule
  /// and was cleared.
  pub fn set_schedule(&mut self, date: NaiveDate, schedule: Schedule) -> bool {
    self.today = date;
    self.schedule = schedule;
    self.locks.roll_over(date);

    let dropped = self
      .selected
      .as_ref()
      .is_some_and(|id| !self.schedule.contains(id));
    if dropped {
      self.selected = None;
    }
    dropped
  }

  /// Make `id` the selected session. Fails with
  /// [`Error::InvalidSession`] unless it is on the schedule.
  pub fn select(&mut self, id: &SessionId) -> Result<&Session> {
    if !self.schedule.contains(id) {
      return Err(Error::InvalidSession(id.clone()));
    }
    self.selected = Some(id.clone());
    self
      .schedule
      .get(id)
      .ok_or_else(|| Error::InvalidSession(id.clone()))
  }

  pub fn selected(&self) -> Option<&Session> {
    self.selected.as_ref().and_then(|id| self.schedule.get(id))
  }

  /// Drop the selection, e.g. after its session failed to load.
  pub fn clear(&mut self) { self.selected = None; }

  pub fn is_locked(&self, id: &SessionId) -> bool {
    self.locks.state(id) == LockState::Locked
  }

  /// Record that `id` is locked. There is no way back to open.
  pub fn mark_locked(&mut self, id: &SessionId) -> bool {
    let date = self.schedule.get(id).map_or(self.today, |s| s.date);
    self.locks.lock(id, date)
  }

  pub fn locks(&self) -> &LockTable { &self.locks }
}

#[cfg(test)]
mod tests {
  use rollcall_core::session::SessionKind;

  use super::*;

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2025, 7, d).unwrap() }

  fn session(id: &str, date: NaiveDate, lecture: u8) -> Session {
    Session {
      session_id:     id.into(),
      subject_id:     "os".into(),
      subject_name:   "Operating Systems".into(),
      kind:           SessionKind::Lecture,
      date,
      lecture_number: lecture,
      batch_id:       None,
      class_name:     "SE".into(),
      division:       "A".into(),
    }
  }

  fn selector_with(ids: &[&str]) -> SessionSelector {
    let mut selector = SessionSelector::new(day(14), 7);
    let sessions = ids
      .iter()
      .enumerate()
      .map(|(i, id)| session(id, day(14), i as u8 + 1))
      .collect();
    selector.set_schedule(day(14), Schedule::new(sessions).unwrap());
    selector
  }

  #[test]
  fn select_unknown_session_fails() {
    let mut selector = selector_with(&["s1"]);
    let err = selector.select(&"s9".into()).unwrap_err();
    assert!(matches!(err, Error::InvalidSession(id) if id.as_str() == "s9"));
    assert!(selector.selected().is_none());
  }

  #[test]
  fn unseen_sessions_are_open() {
    let selector = selector_with(&["s1"]);
    assert!(!selector.is_locked(&"s1".into()));
    assert!(!selector.is_locked(&"never-seen".into()));
  }

  #[test]
  fn mark_locked_is_idempotent_and_survives_switching() {
    let mut selector = selector_with(&["s1", "s2"]);
    selector.select(&"s1".into()).unwrap();
    assert!(selector.mark_locked(&"s1".into()));
    assert!(!selector.mark_locked(&"s1".into()));

    selector.select(&"s2".into()).unwrap();
    assert!(selector.is_locked(&"s1".into()));
    assert!(!selector.is_locked(&"s2".into()));
    assert_eq!(selector.locks().len(), 1);
  }

  #[test]
  fn roll_over_evicts_only_old_sessions() {
    let mut selector = selector_with(&["s1"]);
    selector.mark_locked(&"s1".into());

    let next_week = Schedule::new(vec![session("s2", day(21), 1)]).unwrap();
    selector.set_schedule(day(21), next_week.clone());
    assert!(selector.is_locked(&"s1".into()), "exactly seven days old");

    selector.set_schedule(day(22), next_week);
    assert!(!selector.is_locked(&"s1".into()));
    assert!(selector.locks().is_empty());
  }

  #[test]
  fn new_schedule_clears_missing_selection() {
    let mut selector = selector_with(&["s1"]);
    selector.select(&"s1".into()).unwrap();
    let dropped = selector.set_schedule(
      day(15),
      Schedule::new(vec![session("s2", day(15), 1)]).unwrap(),
    );
    assert!(dropped);
    assert!(selector.selected().is_none());
  }
}
