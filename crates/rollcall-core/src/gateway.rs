//! The `SyncGateway` trait, the contract between the attendance state machine
//! and whatever persists marks.
//!
//! The trait is implemented by the SQLite store (`rollcall-store-sqlite`) and
//! by the HTTP client in `rollcall-cli`. Higher layers depend on this
//! abstraction only. Authentication and retries belong to implementations.

use std::{fmt, future::Future};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  mark::{RemoteMark, Status},
  record::{AttendanceRecord, RecordScope},
  roster::{RosterEntry, StudentId},
  session::{ActorId, Session, SessionId},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Why the gateway refused a request it understood.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
  /// The session was already submitted, possibly by another client.
  AlreadyLocked,
  /// The server's completeness check failed on submit.
  Incomplete,
  NotFound,
  Unauthorized,
  Invalid,
}

/// A business-level refusal from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
  pub reason:  RejectReason,
  pub message: String,
}

impl Rejection {
  pub fn new(reason: RejectReason, message: impl Into<String>) -> Self {
    Self { reason, message: message.into() }
  }

  pub fn already_locked(session_id: &SessionId) -> Self {
    Self::new(
      RejectReason::AlreadyLocked,
      format!("session {session_id} is already submitted"),
    )
  }

  pub fn is_lock(&self) -> bool { self.reason == RejectReason::AlreadyLocked }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.reason, self.message)
  }
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
  /// Transport failure, server error, or a broken backend.
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("rejected: {0}")]
  Rejected(Rejection),
}

impl GatewayError {
  pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
    Self::Rejected(Rejection::new(reason, message))
  }

  /// Whether the gateway reported that the session is locked.
  pub fn is_lock(&self) -> bool {
    matches!(self, Self::Rejected(r) if r.is_lock())
  }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Authoritative source of schedules, rosters and marks.
///
/// All methods return `Send` futures so calls can be spawned onto a
/// multi-threaded runtime; persistence calls are issued from background tasks
/// by the desk.
pub trait SyncGateway: Send + Sync {
  // ── Directory ─────────────────────────────────────────────────────────

  /// The sessions `actor` teaches on `date`.
  fn fetch_schedule(
    &self,
    actor: ActorId,
    date: NaiveDate,
  ) -> impl Future<Output = GatewayResult<Vec<Session>>> + Send + '_;

  /// Students enrolled in a session.
  fn fetch_roster(
    &self,
    session_id: SessionId,
  ) -> impl Future<Output = GatewayResult<Vec<RosterEntry>>> + Send + '_;

  // ── Marks ─────────────────────────────────────────────────────────────

  /// Marks recorded so far for a session.
  fn fetch_marks(
    &self,
    session_id: SessionId,
    date: NaiveDate,
  ) -> impl Future<Output = GatewayResult<Vec<RemoteMark>>> + Send + '_;

  /// Record (or overwrite) one student's status.
  ///
  /// Rejected with [`RejectReason::AlreadyLocked`] once the session has been
  /// submitted.
  fn persist_mark(
    &self,
    session_id: SessionId,
    student_id: StudentId,
    status: Status,
    date: NaiveDate,
  ) -> impl Future<Output = GatewayResult<()>> + Send + '_;

  /// Lock a session and commit its marks.
  ///
  /// Rejected when already locked, or when the server's own completeness
  /// check fails.
  fn submit_session(
    &self,
    session_id: SessionId,
    date: NaiveDate,
  ) -> impl Future<Output = GatewayResult<()>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  /// Committed records of one student, oldest first.
  fn fetch_student_records(
    &self,
    student_id: StudentId,
    scope: RecordScope,
  ) -> impl Future<Output = GatewayResult<Vec<AttendanceRecord>>> + Send + '_;
}
