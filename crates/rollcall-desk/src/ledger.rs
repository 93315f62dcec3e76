//! The working set of marks for the selected session.
//!
//! Each student's value is a small tagged union: either the last value the
//! gateway confirmed, or an optimistic edit waiting on the gateway together
//! with the confirmed value it replaced. Rolling back a rejected edit is a
//! structural revert to that confirmed value.

use std::collections::HashMap;

use rollcall_core::{
  Error, Result,
  mark::{Mark, RemoteMark, Status},
  roster::{Roster, RosterEntry, StudentId},
  session::{Session, SessionId},
};
use serde::Serialize;

// ─── Per-student value ───────────────────────────────────────────────────────

/// Monotonic per-ledger sequence number of an optimistic edit.
pub type WriteSeq = u64;

/// The working value for one student. A student without an entry has no mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkCell {
  Confirmed(Status),
  Pending {
    pending:   Status,
    seq:       WriteSeq,
    /// What the gateway last confirmed; `None` if it never stored a mark.
    confirmed: Option<Status>,
  },
}

impl MarkCell {
  pub fn working(&self) -> Status {
    match *self {
      Self::Confirmed(status) => status,
      Self::Pending { pending, .. } => pending,
    }
  }

  pub fn confirmed(&self) -> Option<Status> {
    match *self {
      Self::Confirmed(status) => Some(status),
      Self::Pending { confirmed, .. } => confirmed,
    }
  }

  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending { .. }) }
}

/// Identifies one optimistic edit so its gateway response can be matched
/// back to the ledger it was made on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTicket {
  pub session_id: SessionId,
  pub student_id: StudentId,
  pub status:     Status,
  pub seq:        WriteSeq,
}

// ─── Read models ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tallies {
  pub present: usize,
  pub late:    usize,
  pub absent:  usize,
  pub total:   usize,
}

/// One roster row as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
  pub student_id:   StudentId,
  pub display_name: String,
  /// Working status, or the display default when unmarked.
  pub status:       Status,
  /// The gateway has stored a mark for this student.
  pub explicit:     bool,
  pub pending:      bool,
}

/// An owned copy of the ledger's visible state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
  pub session_id: SessionId,
  pub committed:  bool,
  pub rows:       Vec<LedgerRow>,
  pub tallies:    Tallies,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Ledger {
  session:   Session,
  roster:    Roster,
  cells:     HashMap<StudentId, MarkCell>,
  committed: bool,
  next_seq:  WriteSeq,
}

impl Ledger {
  /// Build the working set for `session` from its roster and the marks the
  /// gateway already holds. Unmarked students get no cell; they display as
  /// [`Status::DISPLAY_DEFAULT`] without anything being written.
  pub fn load(session: Session, roster: Roster, marks: Vec<RemoteMark>) -> Self {
    let mut cells = HashMap::new();
    let mut committed = false;

    for mark in marks {
      if !roster.contains(&mark.student_id) {
        tracing::debug!(
          session = %session.session_id,
          student = %mark.student_id,
          "ignoring mark for student outside the roster"
        );
        continue;
      }
      committed |= mark.committed;
      cells.insert(mark.student_id, MarkCell::Confirmed(mark.status));
    }

    tracing::debug!(
      session = %session.session_id,
      students = roster.len(),
      marked = cells.len(),
      committed,
      "ledger loaded"
    );

    Self { session, roster, cells, committed, next_seq: 0 }
  }

  pub fn session(&self) -> &Session { &self.session }

  pub fn session_id(&self) -> &SessionId { &self.session.session_id }

  pub fn is_committed(&self) -> bool { self.committed }

  pub fn cell(&self, student_id: &StudentId) -> Option<&MarkCell> {
    self.cells.get(student_id)
  }

  // ── Edits ─────────────────────────────────────────────────────────────

  /// Apply an optimistic edit and return the ticket to settle it with.
  pub fn begin_edit(
    &mut self,
    student_id: &StudentId,
    status: Status,
  ) -> Result<WriteTicket> {
    if self.committed {
      return Err(Error::SessionLocked(self.session.session_id.clone()));
    }
    if !self.roster.contains(student_id) {
      return Err(Error::UnknownStudent(student_id.clone()));
    }

    self.next_seq += 1;
    let seq = self.next_seq;
    let confirmed = self.cells.get(student_id).and_then(MarkCell::confirmed);
    self
      .cells
      .insert(student_id.clone(), MarkCell::Pending { pending: status, seq, confirmed });

    Ok(WriteTicket {
      session_id: self.session.session_id.clone(),
      student_id: student_id.clone(),
      status,
      seq,
    })
  }

  /// The gateway stored the ticket's status.
  pub fn confirm(&mut self, ticket: &WriteTicket) {
    let Some(cell) = self.cells.get_mut(&ticket.student_id) else {
      return;
    };
    match *cell {
      MarkCell::Pending { seq, .. } if seq == ticket.seq => {
        *cell = MarkCell::Confirmed(ticket.status);
      }
      // An older edit landed while a newer one is still out.
      MarkCell::Pending { pending, seq, .. } if seq > ticket.seq => {
        *cell = MarkCell::Pending { pending, seq, confirmed: Some(ticket.status) };
      }
      _ => {}
    }
  }

  /// The gateway stored `status` for an edit made on an earlier load of this
  /// session. A newer local edit stays pending on top of it.
  pub fn confirm_stored(&mut self, student_id: &StudentId, status: Status) {
    if !self.roster.contains(student_id) {
      return;
    }
    self
      .cells
      .entry(student_id.clone())
      .and_modify(|cell| match cell {
        MarkCell::Confirmed(current) => *current = status,
        MarkCell::Pending { confirmed, .. } => *confirmed = Some(status),
      })
      .or_insert(MarkCell::Confirmed(status));
  }

  /// The gateway refused the ticket's status. Reverts to the confirmed value
  /// if this was the latest edit for the student, and returns the value now
  /// shown.
  pub fn roll_back(&mut self, ticket: &WriteTicket) -> Option<Status> {
    if let Some(&MarkCell::Pending { seq, confirmed, .. }) =
      self.cells.get(&ticket.student_id)
      && seq == ticket.seq
    {
      match confirmed {
        Some(status) => {
          self.cells.insert(ticket.student_id.clone(), MarkCell::Confirmed(status));
        }
        None => {
          self.cells.remove(&ticket.student_id);
        }
      }
    }
    self.display_status(&ticket.student_id)
  }

  /// Freeze the working set. Every mark becomes committed.
  pub fn commit(&mut self) { self.committed = true; }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Working status, falling back to the display default for unmarked
  /// students. `None` for students outside the roster.
  pub fn display_status(&self, student_id: &StudentId) -> Option<Status> {
    if !self.roster.contains(student_id) {
      return None;
    }
    Some(
      self
        .cells
        .get(student_id)
        .map_or(Status::DISPLAY_DEFAULT, MarkCell::working),
    )
  }

  /// Roster students the gateway holds no mark for, in roster order.
  pub fn unmarked(&self) -> Vec<StudentId> {
    self
      .roster
      .ids()
      .filter(|id| {
        self
          .cells
          .get(*id)
          .and_then(MarkCell::confirmed)
          .is_none()
      })
      .cloned()
      .collect()
  }

  pub fn pending_count(&self) -> usize {
    self.cells.values().filter(|c| c.is_pending()).count()
  }

  /// Counts over the displayed status of every roster student.
  pub fn tallies(&self) -> Tallies {
    self.roster.ids().fold(
      Tallies { total: self.roster.len(), ..Tallies::default() },
      |mut t, id| {
        match self.cells.get(id).map_or(Status::DISPLAY_DEFAULT, MarkCell::working) {
          Status::Present => t.present += 1,
          Status::Late => t.late += 1,
          Status::Absent => t.absent += 1,
        }
        t
      },
    )
  }

  /// Marks with a working value, in roster order.
  pub fn marks(&self) -> Vec<Mark> {
    self
      .roster
      .ids()
      .filter_map(|id| {
        self.cells.get(id).map(|cell| Mark {
          student_id: id.clone(),
          session_id: self.session.session_id.clone(),
          status:     cell.working(),
          committed:  self.committed,
        })
      })
      .collect()
  }

  fn row(&self, entry: &RosterEntry) -> LedgerRow {
    let cell = self.cells.get(&entry.student_id);
    LedgerRow {
      student_id:   entry.student_id.clone(),
      display_name: entry.display_name.clone(),
      status:       cell.map_or(Status::DISPLAY_DEFAULT, MarkCell::working),
      explicit:     cell.and_then(MarkCell::confirmed).is_some(),
      pending:      cell.is_some_and(MarkCell::is_pending),
    }
  }

  /// Rows whose student name or id matches `query`.
  pub fn search(&self, query: &str) -> Vec<LedgerRow> {
    self.roster.search(query).map(|e| self.row(e)).collect()
  }

  pub fn snapshot(&self) -> LedgerSnapshot {
    LedgerSnapshot {
      session_id: self.session.session_id.clone(),
      committed:  self.committed,
      rows:       self.roster.entries().iter().map(|e| self.row(e)).collect(),
      tallies:    self.tallies(),
    }
  }
}
