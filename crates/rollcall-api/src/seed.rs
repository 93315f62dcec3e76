//! TOML seed files for populating a store with timetable data.
//!
//! ```toml
//! [[students]]
//! student_id   = "st-1"
//! display_name = "Asha Rao"
//! class_name   = "SE"
//! division     = "A"
//!
//! [[sessions]]
//! teacher_id     = "t-01"
//! session_id     = "s1"
//! subject_id     = "os"
//! subject_name   = "Operating Systems"
//! kind           = "lecture"
//! date           = "2025-07-14"
//! lecture_number = 1
//! class_name     = "SE"
//! division       = "A"
//! students       = ["st-1"]
//! ```

use std::{collections::HashMap, path::Path};

use anyhow::{Context as _, anyhow};
use rollcall_core::{
  roster::{RosterEntry, StudentId},
  session::{ActorId, Session},
};
use rollcall_store_sqlite::SqliteStore;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
  #[serde(default)]
  pub students: Vec<RosterEntry>,
  #[serde(default)]
  pub sessions: Vec<SeedSession>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSession {
  pub teacher_id: ActorId,
  #[serde(flatten)]
  pub session:    Session,
  /// Enrolled students, in roster order.
  #[serde(default)]
  pub students:   Vec<StudentId>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedCounts {
  pub sessions:    usize,
  pub enrollments: usize,
}

impl SeedFile {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let text = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read seed file {path:?}"))?;
    Self::parse(&text).with_context(|| format!("invalid seed file {path:?}"))
  }

  pub fn parse(text: &str) -> anyhow::Result<Self> { Ok(toml::from_str(text)?) }

  /// Insert every session and its enrollments. Fails on the first unknown
  /// student id or store error.
  pub async fn apply(&self, store: &SqliteStore) -> anyhow::Result<SeedCounts> {
    let directory: HashMap<&StudentId, &RosterEntry> =
      self.students.iter().map(|s| (&s.student_id, s)).collect();

    let mut counts = SeedCounts::default();
    for seed in &self.sessions {
      let id = &seed.session.session_id;
      store
        .add_session(&seed.teacher_id, &seed.session)
        .await
        .with_context(|| format!("failed to add session {id}"))?;
      counts.sessions += 1;

      for student in &seed.students {
        let entry = directory
          .get(student)
          .ok_or_else(|| anyhow!("session {id} enrolls unknown student {student}"))?;
        store
          .enroll(id, entry)
          .await
          .with_context(|| format!("failed to enroll {student} in {id}"))?;
        counts.enrollments += 1;
      }
    }
    Ok(counts)
  }
}

#[cfg(test)]
mod tests {
  use rollcall_core::gateway::SyncGateway as _;

  use super::*;

  const SEED: &str = r#"
[[students]]
student_id   = "st-1"
display_name = "Asha Rao"
class_name   = "SE"
division     = "A"

[[sessions]]
teacher_id     = "t-01"
session_id     = "p-b1"
subject_id     = "cn"
subject_name   = "Computer Networks"
kind           = "practical"
date           = "2025-07-14"
lecture_number = 3
batch_id       = "B1"
class_name     = "SE"
division       = "A"
students       = ["st-1"]
"#;

  #[tokio::test]
  async fn seeds_sessions_and_rosters() {
    let file = SeedFile::parse(SEED).unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();

    let counts = file.apply(&store).await.unwrap();
    assert_eq!(counts, SeedCounts { sessions: 1, enrollments: 1 });

    let roster = store.fetch_roster("p-b1".into()).await.unwrap();
    assert_eq!(roster[0].display_name, "Asha Rao");
  }

  #[tokio::test]
  async fn unknown_student_fails() {
    let text = SEED.replace(r#"students       = ["st-1"]"#, r#"students = ["st-9"]"#);
    let file = SeedFile::parse(&text).unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(file.apply(&store).await.is_err());
  }
}
