//! [`SqliteStore`]: the SQLite implementation of [`SyncGateway`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use rollcall_core::{
  gateway::{GatewayResult, SyncGateway},
  mark::{RemoteMark, Status},
  record::{AttendanceRecord, RecordScope},
  roster::{RosterEntry, StudentId},
  session::{ActorId, Session, SessionId},
};

use crate::{
  encode::{
    decode_date, decode_status, encode_batch, encode_date, encode_dt,
    encode_kind, encode_status, roster_entry_from_row, RawRecord, RawSession,
    SESSION_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Administration ────────────────────────────────────────────────────

  /// Put a session on `teacher`'s timetable.
  pub async fn add_session(&self, teacher: &ActorId, session: &Session) -> Result<()> {
    let params = (
      session.session_id.to_string(),
      teacher.to_string(),
      session.subject_id.to_string(),
      session.subject_name.clone(),
      encode_kind(session.kind).to_owned(),
      encode_date(session.date),
      session.lecture_number,
      encode_batch(session.batch_id.as_deref()),
      session.class_name.clone(),
      session.division.clone(),
    );

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (
             session_id, teacher_id, subject_id, subject_name, kind,
             date, lecture_number, batch_id, class_name, division
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          params,
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Add a student to a session's roster, creating or refreshing the
  /// student's directory entry.
  pub async fn enroll(&self, session_id: &SessionId, entry: &RosterEntry) -> Result<()> {
    let session_str = session_id.to_string();
    let student_str = entry.student_id.to_string();
    let name        = entry.display_name.clone();
    let class_name  = entry.class_name.clone();
    let division    = entry.division.clone();

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !session_exists(&tx, &session_str)? {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO students (student_id, display_name, class_name, division)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (student_id) DO UPDATE SET
             display_name = excluded.display_name,
             class_name   = excluded.class_name,
             division     = excluded.division",
          rusqlite::params![student_str, name, class_name, division],
        )?;
        tx.execute(
          "INSERT OR IGNORE INTO enrollments (session_id, student_id) VALUES (?1, ?2)",
          rusqlite::params![session_str, student_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::SessionNotFound(session_id.clone()));
    }
    Ok(())
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// Sessions taught by `teacher` on `date`, in lecture order.
  pub async fn schedule_for(&self, teacher: &ActorId, date: NaiveDate) -> Result<Vec<Session>> {
    let teacher_str = teacher.to_string();
    let date_str    = encode_date(date);

    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SESSION_COLUMNS} FROM sessions
           WHERE teacher_id = ?1 AND date = ?2
           ORDER BY lecture_number, batch_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![teacher_str, date_str], RawSession::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::decode).collect()
  }

  /// Students enrolled in `session_id`, in enrollment order.
  pub async fn roster_of(&self, session_id: &SessionId) -> Result<Vec<RosterEntry>> {
    let session_str = session_id.to_string();

    let roster: Option<Vec<RosterEntry>> = self
      .conn
      .call(move |conn| {
        if !session_exists(conn, &session_str)? {
          return Ok(None);
        }
        let mut stmt = conn.prepare(
          "SELECT st.student_id, st.display_name, st.class_name, st.division
           FROM enrollments e
           JOIN students st ON st.student_id = e.student_id
           WHERE e.session_id = ?1
           ORDER BY e.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], roster_entry_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    roster.ok_or_else(|| Error::SessionNotFound(session_id.clone()))
  }

  /// Marks recorded so far. They are reported as committed once the session
  /// has been submitted.
  pub async fn marks_of(&self, session_id: &SessionId, date: NaiveDate) -> Result<Vec<RemoteMark>> {
    self.check_session_date(session_id, date).await?;
    let session_str = session_id.to_string();

    let (raws, committed): (Vec<(String, String)>, bool) = self
      .conn
      .call(move |conn| {
        let committed = is_submitted(conn, &session_str)?;
        let mut stmt = conn.prepare(
          "SELECT m.student_id, m.status
           FROM marks m
           JOIN enrollments e
             ON e.session_id = m.session_id AND e.student_id = m.student_id
           WHERE m.session_id = ?1
           ORDER BY e.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, committed))
      })
      .await?;

    raws
      .into_iter()
      .map(|(student, status)| {
        Ok(RemoteMark {
          student_id: student.into(),
          status: decode_status(&status)?,
          committed,
        })
      })
      .collect()
  }

  /// Committed records of `student_id` within `scope`, oldest first.
  pub async fn records_of(
    &self,
    student_id: &StudentId,
    scope: &RecordScope,
  ) -> Result<Vec<AttendanceRecord>> {
    let student_str = student_id.to_string();

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.session_id, s.subject_id, s.subject_name, s.date, m.status
           FROM marks m
           JOIN sessions s     ON s.session_id = m.session_id
           JOIN submissions sub ON sub.session_id = m.session_id
           WHERE m.student_id = ?1
           ORDER BY s.date, s.lecture_number, s.batch_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_str], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut records = Vec::with_capacity(raws.len());
    for raw in raws {
      let record = raw.decode()?;
      if scope.includes(&record) {
        records.push(record);
      }
    }
    Ok(records)
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Record or overwrite one student's status for an open session.
  pub async fn record_mark(
    &self,
    session_id: &SessionId,
    student_id: &StudentId,
    status: Status,
    date: NaiveDate,
  ) -> Result<()> {
    self.check_session_date(session_id, date).await?;

    let session_str = session_id.to_string();
    let student_str = student_id.to_string();
    let status_str  = encode_status(status);
    let at_str      = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if is_submitted(&tx, &session_str)? {
          return Ok(MarkOutcome::Locked);
        }
        let enrolled = tx
          .query_row(
            "SELECT 1 FROM enrollments WHERE session_id = ?1 AND student_id = ?2",
            rusqlite::params![session_str, student_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !enrolled {
          return Ok(MarkOutcome::NotEnrolled);
        }
        tx.execute(
          "INSERT INTO marks (session_id, student_id, status, recorded_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (session_id, student_id) DO UPDATE SET
             status      = excluded.status,
             recorded_at = excluded.recorded_at",
          rusqlite::params![session_str, student_str, status_str, at_str],
        )?;
        tx.commit()?;
        Ok(MarkOutcome::Recorded)
      })
      .await?;

    match outcome {
      MarkOutcome::Recorded => Ok(()),
      MarkOutcome::Locked => Err(Error::AlreadyLocked(session_id.clone())),
      MarkOutcome::NotEnrolled => Err(Error::NotEnrolled {
        session: session_id.clone(),
        student: student_id.clone(),
      }),
    }
  }

  /// Lock a session. Every enrolled student must already have a mark.
  pub async fn submit(&self, session_id: &SessionId, date: NaiveDate) -> Result<()> {
    self.check_session_date(session_id, date).await?;

    let session_str = session_id.to_string();
    let at_str      = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if is_submitted(&tx, &session_str)? {
          return Ok(SubmitOutcome::Locked);
        }
        let missing: i64 = tx.query_row(
          "SELECT COUNT(*) FROM enrollments e
           LEFT JOIN marks m
             ON m.session_id = e.session_id AND m.student_id = e.student_id
           WHERE e.session_id = ?1 AND m.status IS NULL",
          rusqlite::params![session_str],
          |r| r.get(0),
        )?;
        if missing > 0 {
          return Ok(SubmitOutcome::Unmarked(missing as usize));
        }
        tx.execute(
          "INSERT INTO submissions (session_id, submitted_at) VALUES (?1, ?2)",
          rusqlite::params![session_str, at_str],
        )?;
        tx.commit()?;
        Ok(SubmitOutcome::Submitted)
      })
      .await?;

    match outcome {
      SubmitOutcome::Submitted => {
        tracing::info!(session = %session_id, "session submitted");
        Ok(())
      }
      SubmitOutcome::Locked => Err(Error::AlreadyLocked(session_id.clone())),
      SubmitOutcome::Unmarked(missing) => Err(Error::Incomplete {
        session: session_id.clone(),
        missing,
      }),
    }
  }

  /// Fail unless `session_id` exists and is held on `date`.
  async fn check_session_date(&self, session_id: &SessionId, date: NaiveDate) -> Result<()> {
    let session_str = session_id.to_string();

    let stored: Option<String> = self
      .conn
      .call(move |conn| {
        let date = conn
          .query_row(
            "SELECT date FROM sessions WHERE session_id = ?1",
            rusqlite::params![session_str],
            |r| r.get(0),
          )
          .optional()?;
        Ok(date)
      })
      .await?;

    let Some(stored) = stored else {
      return Err(Error::SessionNotFound(session_id.clone()));
    };
    let expected = decode_date(&stored)?;
    if expected != date {
      return Err(Error::DateMismatch {
        session: session_id.clone(),
        expected,
        given: date,
      });
    }
    Ok(())
  }
}

// Guarded writes decide their outcome inside the transaction.

enum MarkOutcome {
  Recorded,
  Locked,
  NotEnrolled,
}

enum SubmitOutcome {
  Submitted,
  Locked,
  Unmarked(usize),
}

fn session_exists(conn: &rusqlite::Connection, session_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM sessions WHERE session_id = ?1",
        rusqlite::params![session_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn is_submitted(conn: &rusqlite::Connection, session_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM submissions WHERE session_id = ?1",
        rusqlite::params![session_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

// ─── SyncGateway impl ────────────────────────────────────────────────────────

impl SyncGateway for SqliteStore {
  async fn fetch_schedule(&self, actor: ActorId, date: NaiveDate) -> GatewayResult<Vec<Session>> {
    Ok(self.schedule_for(&actor, date).await?)
  }

  async fn fetch_roster(&self, session_id: SessionId) -> GatewayResult<Vec<RosterEntry>> {
    Ok(self.roster_of(&session_id).await?)
  }

  async fn fetch_marks(
    &self,
    session_id: SessionId,
    date: NaiveDate,
  ) -> GatewayResult<Vec<RemoteMark>> {
    Ok(self.marks_of(&session_id, date).await?)
  }

  async fn persist_mark(
    &self,
    session_id: SessionId,
    student_id: StudentId,
    status: Status,
    date: NaiveDate,
  ) -> GatewayResult<()> {
    Ok(self.record_mark(&session_id, &student_id, status, date).await?)
  }

  async fn submit_session(&self, session_id: SessionId, date: NaiveDate) -> GatewayResult<()> {
    Ok(self.submit(&session_id, date).await?)
  }

  async fn fetch_student_records(
    &self,
    student_id: StudentId,
    scope: RecordScope,
  ) -> GatewayResult<Vec<AttendanceRecord>> {
    Ok(self.records_of(&student_id, &scope).await?)
  }
}
