//! Sessions: the schedulable teaching slots attendance is taken for.

use std::{
  collections::{HashMap, HashSet},
  fmt,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Opaque session key, stable for the day it was scheduled on.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SessionId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for SessionId {
  fn from(s: String) -> Self { Self(s) }
}

/// Subject key as assigned by the timetable.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SubjectId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

/// The teacher or student on whose behalf requests are made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ActorId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Whether a slot is a whole-class lecture or a (possibly batched) practical.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionKind {
  Lecture,
  Practical,
}

/// One scheduled teaching slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub session_id:     SessionId,
  pub subject_id:     SubjectId,
  /// Display name of the subject, e.g. "Operating Systems".
  pub subject_name:   String,
  pub kind:           SessionKind,
  /// Calendar day the session is held on.
  pub date:           NaiveDate,
  /// Ordinal of the slot within the day, starting at 1.
  pub lecture_number: u8,
  /// Set only for practicals split into batches.
  pub batch_id:       Option<String>,
  pub class_name:     String,
  pub division:       String,
}

/// The tuple a [`SessionId`] must be unique for.
pub type SlotKey<'a> = (NaiveDate, &'a SubjectId, u8, Option<&'a str>);

impl Session {
  pub fn slot_key(&self) -> SlotKey<'_> {
    (
      self.date,
      &self.subject_id,
      self.lecture_number,
      self.batch_id.as_deref(),
    )
  }

  /// Label used when listing the day's sessions, e.g. `Lecture 3 - Networks`.
  pub fn label(&self) -> String {
    let ordinal = match self.kind {
      SessionKind::Lecture => "Lecture",
      SessionKind::Practical => "Practical",
    };
    match &self.batch_id {
      Some(batch) => format!(
        "{ordinal} {} - {} ({batch})",
        self.lecture_number, self.subject_name
      ),
      None => format!("{ordinal} {} - {}", self.lecture_number, self.subject_name),
    }
  }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// The sessions an actor has on one day, in the order the directory returned
/// them.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
  sessions: Vec<Session>,
}

impl Schedule {
  /// Build a schedule, rejecting sessions that break the id/slot uniqueness
  /// rule: one id per slot, one slot per id.
  pub fn new(sessions: Vec<Session>) -> Result<Self> {
    check_unique(&sessions)?;

    let mut seen = HashSet::new();
    let sessions = sessions
      .into_iter()
      .filter(|s| seen.insert(s.session_id.clone()))
      .collect();
    Ok(Self { sessions })
  }

  pub fn sessions(&self) -> &[Session] { &self.sessions }

  pub fn get(&self, id: &SessionId) -> Option<&Session> {
    self.sessions.iter().find(|s| &s.session_id == id)
  }

  pub fn contains(&self, id: &SessionId) -> bool { self.get(id).is_some() }

  /// The session offered by default when the day's schedule is opened.
  pub fn first(&self) -> Option<&Session> { self.sessions.first() }

  pub fn is_empty(&self) -> bool { self.sessions.is_empty() }
}

fn check_unique(sessions: &[Session]) -> Result<()> {
  let mut by_slot: HashMap<SlotKey<'_>, &SessionId> = HashMap::new();
  let mut by_id: HashMap<&SessionId, SlotKey<'_>> = HashMap::new();

  for session in sessions {
    let key = session.slot_key();
    if let Some(existing) = by_slot.insert(key, &session.session_id)
      && existing != &session.session_id
    {
      return Err(Error::DuplicateSession(session.session_id.clone()));
    }
    if let Some(existing) = by_id.insert(&session.session_id, key)
      && existing != key
    {
      return Err(Error::DuplicateSession(session.session_id.clone()));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session(id: &str, subject: &str, lecture: u8, batch: Option<&str>) -> Session {
    Session {
      session_id:     id.into(),
      subject_id:     subject.into(),
      subject_name:   subject.to_uppercase(),
      kind:           if batch.is_some() {
        SessionKind::Practical
      } else {
        SessionKind::Lecture
      },
      date:           NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
      lecture_number: lecture,
      batch_id:       batch.map(str::to_owned),
      class_name:     "SE".into(),
      division:       "A".into(),
    }
  }

  #[test]
  fn two_ids_for_one_slot_are_rejected() {
    let err = Schedule::new(vec![
      session("s1", "os", 1, None),
      session("s2", "os", 1, None),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateSession(id) if id.as_str() == "s2"));
  }

  #[test]
  fn one_id_for_two_slots_is_rejected() {
    let err = Schedule::new(vec![
      session("s1", "os", 1, None),
      session("s1", "os", 2, None),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateSession(_)));
  }

  #[test]
  fn batches_of_one_practical_are_distinct_slots() {
    let schedule = Schedule::new(vec![
      session("p1", "cn", 4, Some("B1")),
      session("p2", "cn", 4, Some("B2")),
    ])
    .unwrap();
    assert_eq!(schedule.sessions().len(), 2);
    assert_eq!(schedule.first().unwrap().session_id.as_str(), "p1");
  }

  #[test]
  fn repeated_entries_collapse() {
    let schedule = Schedule::new(vec![
      session("s1", "os", 1, None),
      session("s1", "os", 1, None),
    ])
    .unwrap();
    assert_eq!(schedule.sessions().len(), 1);
  }

  #[test]
  fn label_includes_batch() {
    assert_eq!(session("p1", "cn", 4, Some("B1")).label(), "Practical 4 - CN (B1)");
    assert_eq!(session("s1", "os", 2, None).label(), "Lecture 2 - OS");
  }
}
