//! Students eligible for a session.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

/// Student key (the roll number in most deployments).
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for StudentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for StudentId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for StudentId {
  fn from(s: String) -> Self { Self(s) }
}

/// A student enrolled in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
  pub student_id:   StudentId,
  pub display_name: String,
  pub class_name:   String,
  pub division:     String,
}

impl RosterEntry {
  /// Case-insensitive match on the display name, or a substring match on the
  /// student id.
  pub fn matches(&self, query: &str) -> bool {
    let query = query.trim();
    query.is_empty()
      || self
        .display_name
        .to_lowercase()
        .contains(&query.to_lowercase())
      || self.student_id.as_str().contains(query)
  }
}

/// An ordered roster in which each student appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
  entries: Vec<RosterEntry>,
}

impl Roster {
  /// Build a roster, keeping the first occurrence of any repeated student.
  pub fn new(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
    let mut seen = HashSet::new();
    let entries = entries
      .into_iter()
      .filter(|e| seen.insert(e.student_id.clone()))
      .collect();
    Self { entries }
  }

  pub fn entries(&self) -> &[RosterEntry] { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn contains(&self, id: &StudentId) -> bool {
    self.entries.iter().any(|e| &e.student_id == id)
  }

  pub fn ids(&self) -> impl Iterator<Item = &StudentId> {
    self.entries.iter().map(|e| &e.student_id)
  }

  /// Entries whose name or id matches `query`; see [`RosterEntry::matches`].
  pub fn search<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Iterator<Item = &'a RosterEntry> + 'a {
    self.entries.iter().filter(move |e| e.matches(query))
  }

  /// The sub-roster for one class and division.
  pub fn for_class(&self, class_name: &str, division: &str) -> Roster {
    Roster {
      entries: self
        .entries
        .iter()
        .filter(|e| e.class_name == class_name && e.division == division)
        .cloned()
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(id: &str, name: &str, division: &str) -> RosterEntry {
    RosterEntry {
      student_id:   id.into(),
      display_name: name.into(),
      class_name:   "SE".into(),
      division:     division.into(),
    }
  }

  #[test]
  fn repeated_students_keep_first_entry() {
    let roster = Roster::new([
      entry("101", "Asha Patil", "A"),
      entry("102", "Rohan Mehta", "A"),
      entry("101", "Asha P.", "A"),
    ]);
    assert_eq!(roster.len(), 2);
    assert_eq!(roster.entries()[0].display_name, "Asha Patil");
  }

  #[test]
  fn search_by_name_or_roll_number() {
    let roster = Roster::new([
      entry("101", "Asha Patil", "A"),
      entry("102", "Rohan Mehta", "A"),
      entry("210", "Meera Shah", "B"),
    ]);

    let by_name: Vec<_> = roster.search("meh").map(|e| e.student_id.as_str()).collect();
    assert_eq!(by_name, ["102"]);

    let by_id: Vec<_> = roster.search("10").map(|e| e.student_id.as_str()).collect();
    assert_eq!(by_id, ["101", "102", "210"]);

    assert_eq!(roster.search("  ").count(), 3);
  }

  #[test]
  fn for_class_filters_division() {
    let roster = Roster::new([
      entry("101", "Asha Patil", "A"),
      entry("210", "Meera Shah", "B"),
    ]);
    let b = roster.for_class("SE", "B");
    assert_eq!(b.len(), 1);
    assert!(b.contains(&"210".into()));
  }
}
