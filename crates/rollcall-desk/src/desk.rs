//! [`AttendanceDesk`] drives a selector and a ledger against a gateway.
//!
//! Local state changes are applied synchronously; gateway calls run on
//! spawned tasks and reconcile when they resolve. Responses are fenced by
//! session: one for a session the user has since navigated away from never
//! touches the new working set, while one for a session that was reloaded in
//! the meantime is applied to the reloaded working set.

use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use rollcall_core::{
  Error, Result,
  gateway::{GatewayError, SyncGateway},
  mark::Status,
  record::RecordScope,
  roster::{Roster, StudentId},
  session::{ActorId, Schedule, Session, SessionId},
};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
  config::DeskConfig,
  ledger::{Ledger, LedgerRow, LedgerSnapshot, Tallies, WriteTicket},
  report::AttendanceReport,
  selector::SessionSelector,
};

// ─── In-flight guard ─────────────────────────────────────────────────────────

/// Outstanding gateway writes for one session.
#[derive(Debug, Default)]
struct InFlight {
  marks:      usize,
  submitting: bool,
}

impl InFlight {
  fn is_idle(&self) -> bool { self.marks == 0 && !self.submitting }
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct DeskState {
  selector:   SessionSelector,
  ledger:     Option<Ledger>,
  /// Bumped whenever the working set is discarded.
  generation: u64,
  in_flight:  HashMap<SessionId, InFlight>,
  /// Marks the gateway stored for the selected session while its working
  /// set was still loading.
  landed:     Vec<(StudentId, Status)>,
}

impl DeskState {
  fn discard_ledger(&mut self) {
    if let Some(ledger) = self.ledger.take()
      && ledger.pending_count() > 0
    {
      tracing::warn!(
        session = %ledger.session_id(),
        pending = ledger.pending_count(),
        "abandoning unconfirmed edits"
      );
    }
    self.landed.clear();
    self.generation += 1;
  }

  /// The ledger, if it is still the one loaded at `generation`.
  fn current_ledger(&mut self, generation: u64) -> Option<&mut Ledger> {
    if self.generation == generation {
      self.ledger.as_mut()
    } else {
      None
    }
  }

  /// The ledger, if it holds session `id`, whichever load it came from.
  fn session_ledger(&mut self, id: &SessionId) -> Option<&mut Ledger> {
    self.ledger.as_mut().filter(|l| l.session_id() == id)
  }

  /// Session `id` is selected and its working set has not arrived yet.
  fn is_loading(&self, id: &SessionId) -> bool {
    self.ledger.is_none()
      && self.selector.selected().is_some_and(|s| &s.session_id == id)
  }

  fn in_flight(&mut self, id: &SessionId) -> &mut InFlight {
    self.in_flight.entry(id.clone()).or_default()
  }

  fn is_busy(&self, id: &SessionId) -> bool {
    self.in_flight.get(id).is_some_and(|f| !f.is_idle())
  }

  fn settle(&mut self, id: &SessionId, f: impl FnOnce(&mut InFlight)) {
    if let Some(entry) = self.in_flight.get_mut(id) {
      f(entry);
      if entry.is_idle() {
        self.in_flight.remove(id);
      }
    }
  }

  /// Apply a gateway report that `id` is locked.
  fn reconcile_locked(&mut self, id: &SessionId) {
    if self.selector.mark_locked(id) {
      tracing::info!(session = %id, "session locked");
    }
    if let Some(ledger) = self.session_ledger(id) {
      ledger.commit();
    }
  }
}

// ─── Pending write ───────────────────────────────────────────────────────────

/// Handle to a gateway write running in the background.
///
/// Dropping the handle does not cancel the write; its outcome is still
/// reconciled into the desk.
#[must_use = "the write's outcome is only observable through this handle"]
#[derive(Debug)]
pub struct PendingWrite {
  session_id: SessionId,
  handle:     JoinHandle<Result<()>>,
}

impl PendingWrite {
  pub fn session_id(&self) -> &SessionId { &self.session_id }

  /// Wait for the gateway's verdict. By the time this returns, the desk has
  /// already confirmed or rolled back the local state.
  pub async fn settled(self) -> Result<()> {
    self
      .handle
      .await
      .map_err(|e| Error::GatewayUnavailable(format!("write task failed: {e}")))?
  }
}

// ─── Desk ────────────────────────────────────────────────────────────────────

/// The attendance-session state machine for one actor.
///
/// Cheap to clone; clones share state.
pub struct AttendanceDesk<G> {
  gateway: Arc<G>,
  actor:   ActorId,
  state:   Arc<Mutex<DeskState>>,
}

impl<G> Clone for AttendanceDesk<G> {
  fn clone(&self) -> Self {
    Self {
      gateway: Arc::clone(&self.gateway),
      actor:   self.actor.clone(),
      state:   Arc::clone(&self.state),
    }
  }
}

impl<G> AttendanceDesk<G>
where
  G: SyncGateway + 'static,
{
  pub fn new(
    gateway: Arc<G>,
    actor: ActorId,
    today: NaiveDate,
    config: &DeskConfig,
  ) -> Self {
    let state = DeskState {
      selector:   SessionSelector::new(today, config.lock_retention_days),
      ledger:     None,
      generation: 0,
      in_flight:  HashMap::new(),
      landed:     Vec::new(),
    };
    Self { gateway, actor, state: Arc::new(Mutex::new(state)) }
  }

  pub fn actor(&self) -> &ActorId { &self.actor }

  // ── Selection ─────────────────────────────────────────────────────────

  /// Fetch the actor's sessions for `date` and make them the schedule.
  pub async fn refresh_schedule(&self, date: NaiveDate) -> Result<Vec<Session>> {
    let sessions = self
      .gateway
      .fetch_schedule(self.actor.clone(), date)
      .await?;
    let schedule = Schedule::new(sessions)?;
    let listed = schedule.sessions().to_vec();

    let mut state = self.state.lock().await;
    if state.selector.set_schedule(date, schedule) {
      state.discard_ledger();
    }
    tracing::debug!(actor = %self.actor, %date, sessions = listed.len(), "schedule refreshed");
    Ok(listed)
  }

  /// Switch to `session_id`, discarding the current working set, and load
  /// its roster and marks.
  ///
  /// The session counts as selected while it loads. If the load fails the
  /// desk is left with no selection; if another selection starts first this
  /// returns [`Error::SelectionSuperseded`] and installs nothing.
  pub async fn select_session(&self, session_id: &SessionId) -> Result<LedgerSnapshot> {
    let (session, generation) = {
      let mut state = self.state.lock().await;
      let session = state.selector.select(session_id)?.clone();
      state.discard_ledger();
      (session, state.generation)
    };

    let loaded = tokio::try_join!(
      self.gateway.fetch_roster(session_id.clone()),
      self.gateway.fetch_marks(session_id.clone(), session.date),
    );

    let mut state = self.state.lock().await;
    if state.generation != generation {
      return Err(Error::SelectionSuperseded(session_id.clone()));
    }
    let (roster, marks) = match loaded {
      Ok(loaded) => loaded,
      Err(e) => {
        state.selector.clear();
        state.landed.clear();
        tracing::warn!(session = %session_id, error = %e, "session load failed");
        return Err(e.into());
      }
    };

    let roster = Roster::new(roster);
    let enrolled = roster.for_class(&session.class_name, &session.division);
    if enrolled.len() < roster.len() {
      tracing::debug!(
        session = %session_id,
        dropped = roster.len() - enrolled.len(),
        "ignoring roster entries outside the session's class"
      );
    }

    let mut ledger = Ledger::load(session, enrolled, marks);
    for (student_id, status) in std::mem::take(&mut state.landed) {
      ledger.confirm_stored(&student_id, status);
    }
    if ledger.is_committed() {
      state.selector.mark_locked(session_id);
    }
    if state.selector.is_locked(session_id) {
      ledger.commit();
    }
    let snapshot = ledger.snapshot();
    state.ledger = Some(ledger);
    Ok(snapshot)
  }

  /// The session offered when none is named: the first on the schedule.
  pub async fn first_session(&self) -> Option<Session> {
    self.state.lock().await.selector.schedule().first().cloned()
  }

  pub async fn selected(&self) -> Option<Session> {
    self.state.lock().await.selector.selected().cloned()
  }

  pub async fn schedule(&self) -> Vec<Session> {
    self.state.lock().await.selector.schedule().sessions().to_vec()
  }

  pub async fn is_locked(&self, session_id: &SessionId) -> bool {
    self.state.lock().await.selector.is_locked(session_id)
  }

  // ── Edits ─────────────────────────────────────────────────────────────

  /// Optimistically set `student_id`'s status and persist it in the
  /// background.
  ///
  /// Local validation errors are returned immediately and never reach the
  /// gateway. A gateway failure rolls the student back to their last
  /// confirmed status and is reported through the returned handle.
  pub async fn set_status(
    &self,
    student_id: &StudentId,
    status: Status,
  ) -> Result<PendingWrite> {
    let (ticket, date, generation) = {
      let mut state = self.state.lock().await;
      let generation = state.generation;
      let session_id = state
        .ledger
        .as_ref()
        .map(|l| l.session_id().clone())
        .ok_or(Error::NoSessionSelected)?;

      if state.selector.is_locked(&session_id) {
        return Err(Error::SessionLocked(session_id));
      }
      if state.in_flight.get(&session_id).is_some_and(|f| f.submitting) {
        return Err(Error::WriteInFlight(session_id));
      }

      let ledger = state.ledger.as_mut().ok_or(Error::NoSessionSelected)?;
      let ticket = ledger.begin_edit(student_id, status)?;
      let date = ledger.session().date;
      state.in_flight(&session_id).marks += 1;
      (ticket, date, generation)
    };

    tracing::debug!(
      session = %ticket.session_id,
      student = %ticket.student_id,
      %status,
      "mark edited"
    );

    let session_id = ticket.session_id.clone();
    let gateway = Arc::clone(&self.gateway);
    let state = Arc::clone(&self.state);
    let handle = tokio::spawn(async move {
      let result = gateway
        .persist_mark(
          ticket.session_id.clone(),
          ticket.student_id.clone(),
          ticket.status,
          date,
        )
        .await;

      let mut state = state.lock().await;
      state.settle(&ticket.session_id, |f| f.marks = f.marks.saturating_sub(1));
      settle_mark(&mut state, &ticket, generation, result)
    });

    Ok(PendingWrite { session_id, handle })
  }

  /// Submit the selected session, locking it once the gateway confirms.
  ///
  /// Refused locally while any edit for the session is unconfirmed or while
  /// a roster student has no stored mark.
  pub async fn submit(&self) -> Result<PendingWrite> {
    let (session_id, date) = {
      let mut state = self.state.lock().await;
      let ledger = state.ledger.as_ref().ok_or(Error::NoSessionSelected)?;
      let session_id = ledger.session_id().clone();
      let date = ledger.session().date;

      if ledger.is_committed() || state.selector.is_locked(&session_id) {
        return Err(Error::SessionLocked(session_id));
      }
      let missing = ledger.unmarked();
      if state.is_busy(&session_id) {
        return Err(Error::WriteInFlight(session_id));
      }
      if !missing.is_empty() {
        return Err(Error::IncompleteRoster { missing });
      }
      state.in_flight(&session_id).submitting = true;
      (session_id, date)
    };

    tracing::info!(session = %session_id, "submitting session");

    let gateway = Arc::clone(&self.gateway);
    let state = Arc::clone(&self.state);
    let id = session_id.clone();
    let handle = tokio::spawn(async move {
      let result = gateway.submit_session(id.clone(), date).await;

      let mut state = state.lock().await;
      state.settle(&id, |f| f.submitting = false);
      match result {
        Ok(()) => {
          state.reconcile_locked(&id);
          Ok(())
        }
        Err(e) => {
          if e.is_lock() {
            state.reconcile_locked(&id);
          }
          tracing::warn!(session = %id, error = %e, "submission failed");
          Err(e.into())
        }
      }
    });

    Ok(PendingWrite { session_id, handle })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn snapshot(&self) -> Option<LedgerSnapshot> {
    self.state.lock().await.ledger.as_ref().map(Ledger::snapshot)
  }

  pub async fn tallies(&self) -> Option<Tallies> {
    self.state.lock().await.ledger.as_ref().map(Ledger::tallies)
  }

  pub async fn search(&self, query: &str) -> Vec<LedgerRow> {
    self
      .state
      .lock()
      .await
      .ledger
      .as_ref()
      .map(|l| l.search(query))
      .unwrap_or_default()
  }

  /// Fetch a student's committed history and aggregate it.
  pub async fn student_report(&self, student_id: &StudentId) -> Result<AttendanceReport> {
    let records = self
      .gateway
      .fetch_student_records(student_id.clone(), RecordScope::All)
      .await?;
    Ok(AttendanceReport::from_records(&records))
  }
}

/// Reconcile a persisted mark's gateway outcome into the desk.
fn settle_mark(
  state: &mut DeskState,
  ticket: &WriteTicket,
  generation: u64,
  result: Result<(), GatewayError>,
) -> Result<()> {
  match result {
    Ok(()) => {
      let same_load = state.generation == generation;
      let loading = state.is_loading(&ticket.session_id);
      match state.session_ledger(&ticket.session_id) {
        Some(ledger) if same_load => ledger.confirm(ticket),
        // Reloaded since the edit was made.
        Some(ledger) => ledger.confirm_stored(&ticket.student_id, ticket.status),
        None if loading => {
          state.landed.push((ticket.student_id.clone(), ticket.status));
        }
        None => tracing::debug!(
          session = %ticket.session_id,
          student = %ticket.student_id,
          "dropping confirmation for a session no longer selected"
        ),
      }
      Ok(())
    }
    // A reloaded working set already shows what the gateway holds, so only
    // the ledger the edit was made on is rolled back.
    Err(e) => {
      if let Some(ledger) = state.current_ledger(generation) {
        let shown = ledger.roll_back(ticket);
        tracing::warn!(
          session = %ticket.session_id,
          student = %ticket.student_id,
          attempted = %ticket.status,
          restored = ?shown,
          error = %e,
          "mark rolled back"
        );
      }
      if e.is_lock() {
        state.reconcile_locked(&ticket.session_id);
      }
      Err(e.into())
    }
  }
}
