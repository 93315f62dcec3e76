//! Marks: one student's attendance status within one session.

use serde::{Deserialize, Serialize};

use crate::{roster::StudentId, session::SessionId};

/// Attendance status of a student for one session.
///
/// There is no "unset" status on the wire: a student without a mark simply
/// has no [`Mark`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Status {
  Present,
  Late,
  Absent,
}

impl Status {
  /// Shown for students that have not been marked yet.
  pub const DISPLAY_DEFAULT: Status = Status::Present;

  /// Whether the student was in the room. Late arrivals attended.
  pub fn attended(self) -> bool { matches!(self, Self::Present | Self::Late) }
}

/// A persisted status for `(student_id, session_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
  pub student_id: StudentId,
  pub session_id: SessionId,
  pub status:     Status,
  /// `true` once the session has been submitted; the status is frozen.
  pub committed:  bool,
}

/// A mark as returned by the gateway for a session already known to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMark {
  pub student_id: StudentId,
  pub status:     Status,
  #[serde(default)]
  pub committed:  bool,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!(Status::from_str("late").unwrap(), Status::Late);
    assert_eq!(Status::from_str("ABSENT").unwrap(), Status::Absent);
    assert!(Status::from_str("excused").is_err());
  }

  #[test]
  fn late_counts_as_attended() {
    assert!(Status::Present.attended());
    assert!(Status::Late.attended());
    assert!(!Status::Absent.attended());
  }
}
