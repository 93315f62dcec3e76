//! Error type for `rollcall-store-sqlite`.

use rollcall_core::{
  gateway::{GatewayError, RejectReason, Rejection},
  roster::StudentId,
  session::SessionId,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rollcall_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("session not found: {0}")]
  SessionNotFound(SessionId),

  #[error("student {student} is not enrolled in session {session}")]
  NotEnrolled {
    session: SessionId,
    student: StudentId,
  },

  #[error("session {session} is held on {expected}, not {given}")]
  DateMismatch {
    session:  SessionId,
    expected: chrono::NaiveDate,
    given:    chrono::NaiveDate,
  },

  #[error("session {0} is already submitted")]
  AlreadyLocked(SessionId),

  #[error("session {session} has {missing} unmarked student(s)")]
  Incomplete {
    session: SessionId,
    missing: usize,
  },
}

impl From<Error> for GatewayError {
  fn from(e: Error) -> Self {
    let reason = match &e {
      Error::AlreadyLocked(_) => RejectReason::AlreadyLocked,
      Error::Incomplete { .. } => RejectReason::Incomplete,
      Error::SessionNotFound(_) | Error::NotEnrolled { .. } => RejectReason::NotFound,
      Error::DateMismatch { .. } => RejectReason::Invalid,
      Error::Core(_) | Error::Database(_) | Error::Decode(_) => {
        return GatewayError::Unavailable(e.to_string());
      }
    };
    GatewayError::Rejected(Rejection::new(reason, e.to_string()))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
