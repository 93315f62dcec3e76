//! Error types for `rollcall-core`.

use thiserror::Error;

use crate::{
  gateway::{GatewayError, Rejection},
  roster::StudentId,
  session::SessionId,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("session {0} is not on today's schedule")]
  InvalidSession(SessionId),

  #[error("student {0} is not on the roster of the selected session")]
  UnknownStudent(StudentId),

  #[error("session {0} is locked")]
  SessionLocked(SessionId),

  #[error("{} student(s) have no explicit status", .missing.len())]
  IncompleteRoster { missing: Vec<StudentId> },

  #[error("gateway unavailable: {0}")]
  GatewayUnavailable(String),

  #[error("gateway rejected the request: {0}")]
  GatewayRejected(Rejection),

  #[error("no session is selected")]
  NoSessionSelected,

  #[error("selection of session {0} was replaced before it finished loading")]
  SelectionSuperseded(SessionId),

  #[error("a write for session {0} is still in flight")]
  WriteInFlight(SessionId),

  #[error("session id {0} is used for more than one slot")]
  DuplicateSession(SessionId),
}

impl From<GatewayError> for Error {
  fn from(e: GatewayError) -> Self {
    match e {
      GatewayError::Unavailable(msg) => Self::GatewayUnavailable(msg),
      GatewayError::Rejected(rejection) => Self::GatewayRejected(rejection),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
