//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Calendar days are stored as `YYYY-MM-DD`, timestamps as RFC 3339 strings,
//! and enums as lowercase discriminants.

use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::{
  mark::Status,
  record::AttendanceRecord,
  roster::RosterEntry,
  session::{Session, SessionKind},
};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str {
  match s {
    Status::Present => "present",
    Status::Late => "late",
    Status::Absent => "absent",
  }
}

pub fn decode_status(s: &str) -> Result<Status> {
  match s {
    "present" => Ok(Status::Present),
    "late" => Ok(Status::Late),
    "absent" => Ok(Status::Absent),
    other => Err(Error::Decode(format!("unknown status: {other:?}"))),
  }
}

// ─── SessionKind ─────────────────────────────────────────────────────────────

pub fn encode_kind(k: SessionKind) -> &'static str {
  match k {
    SessionKind::Lecture => "lecture",
    SessionKind::Practical => "practical",
  }
}

pub fn decode_kind(s: &str) -> Result<SessionKind> {
  match s {
    "lecture" => Ok(SessionKind::Lecture),
    "practical" => Ok(SessionKind::Practical),
    other => Err(Error::Decode(format!("unknown session kind: {other:?}"))),
  }
}

// ─── Batch ───────────────────────────────────────────────────────────────────

/// Unbatched sessions store an empty string so the slot UNIQUE constraint
/// treats them as equal.
pub fn encode_batch(b: Option<&str>) -> String { b.unwrap_or_default().to_owned() }

pub fn decode_batch(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column order matches [`SESSION_COLUMNS`].
pub struct RawSession {
  pub session_id:     String,
  pub subject_id:     String,
  pub subject_name:   String,
  pub kind:           String,
  pub date:           String,
  pub lecture_number: u8,
  pub batch_id:       String,
  pub class_name:     String,
  pub division:       String,
}

pub const SESSION_COLUMNS: &str = "session_id, subject_id, subject_name, kind, \
                                   date, lecture_number, batch_id, class_name, \
                                   division";

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:     row.get(0)?,
      subject_id:     row.get(1)?,
      subject_name:   row.get(2)?,
      kind:           row.get(3)?,
      date:           row.get(4)?,
      lecture_number: row.get(5)?,
      batch_id:       row.get(6)?,
      class_name:     row.get(7)?,
      division:       row.get(8)?,
    })
  }

  pub fn decode(self) -> Result<Session> {
    Ok(Session {
      session_id:     self.session_id.into(),
      subject_id:     self.subject_id.as_str().into(),
      subject_name:   self.subject_name,
      kind:           decode_kind(&self.kind)?,
      date:           decode_date(&self.date)?,
      lecture_number: self.lecture_number,
      batch_id:       decode_batch(self.batch_id),
      class_name:     self.class_name,
      division:       self.division,
    })
  }
}

pub fn roster_entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RosterEntry> {
  Ok(RosterEntry {
    student_id:   row.get::<_, String>(0)?.into(),
    display_name: row.get(1)?,
    class_name:   row.get(2)?,
    division:     row.get(3)?,
  })
}

/// `(session_id, subject_id, subject_name, date, status)` of one committed
/// mark.
pub struct RawRecord {
  pub session_id:   String,
  pub subject_id:   String,
  pub subject_name: String,
  pub date:         String,
  pub status:       String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:   row.get(0)?,
      subject_id:   row.get(1)?,
      subject_name: row.get(2)?,
      date:         row.get(3)?,
      status:       row.get(4)?,
    })
  }

  pub fn decode(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      session_id:   self.session_id.into(),
      subject_id:   self.subject_id.as_str().into(),
      subject_name: self.subject_name,
      date:         decode_date(&self.date)?,
      status:       decode_status(&self.status)?,
    })
  }
}
