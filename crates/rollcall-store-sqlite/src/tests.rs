//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use rollcall_core::{
  gateway::{GatewayError, RejectReason, SyncGateway},
  mark::Status,
  record::RecordScope,
  roster::{RosterEntry, StudentId},
  session::{ActorId, Session, SessionId, SessionKind},
};

use crate::{Error, SqliteStore};

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2025, 7, d).unwrap() }

fn teacher() -> ActorId { "t-01".into() }

fn session(id: &str, subject: &str, date: NaiveDate, lecture: u8) -> Session {
  Session {
    session_id:     id.into(),
    subject_id:     subject.into(),
    subject_name:   subject.to_uppercase(),
    kind:           SessionKind::Lecture,
    date,
    lecture_number: lecture,
    batch_id:       None,
    class_name:     "SE".into(),
    division:       "A".into(),
  }
}

fn student(id: &str, name: &str) -> RosterEntry {
  RosterEntry {
    student_id:   id.into(),
    display_name: name.into(),
    class_name:   "SE".into(),
    division:     "A".into(),
  }
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store with one session `s1` on day 14 and two enrolled students.
async fn seeded() -> SqliteStore {
  let s = store().await;
  s.add_session(&teacher(), &session("s1", "os", day(14), 2))
    .await
    .unwrap();
  s.enroll(&"s1".into(), &student("st-1", "Asha Rao")).await.unwrap();
  s.enroll(&"s1".into(), &student("st-2", "Vikram Iyer")).await.unwrap();
  s
}

// ─── Schedule & roster ───────────────────────────────────────────────────────

#[tokio::test]
async fn schedule_is_per_teacher_and_day_in_lecture_order() {
  let s = store().await;
  s.add_session(&teacher(), &session("late", "cn", day(14), 4)).await.unwrap();
  s.add_session(&teacher(), &session("early", "os", day(14), 1)).await.unwrap();
  s.add_session(&teacher(), &session("tomorrow", "os", day(15), 1)).await.unwrap();
  s.add_session(&"t-02".into(), &session("other", "db", day(14), 2)).await.unwrap();

  let sessions = s.fetch_schedule(teacher(), day(14)).await.unwrap();
  let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
  assert_eq!(ids, ["early", "late"]);
}

#[tokio::test]
async fn batched_sessions_share_a_lecture_slot() {
  let s = store().await;
  let mut b1 = session("p-b1", "cn", day(14), 3);
  b1.kind = SessionKind::Practical;
  b1.batch_id = Some("B1".into());
  let mut b2 = b1.clone();
  b2.session_id = "p-b2".into();
  b2.batch_id = Some("B2".into());

  s.add_session(&teacher(), &b1).await.unwrap();
  s.add_session(&teacher(), &b2).await.unwrap();

  let sessions = s.fetch_schedule(teacher(), day(14)).await.unwrap();
  assert_eq!(sessions, vec![b1, b2]);
}

#[tokio::test]
async fn duplicate_slot_is_refused() {
  let s = store().await;
  s.add_session(&teacher(), &session("a", "os", day(14), 1)).await.unwrap();
  let err = s
    .add_session(&teacher(), &session("b", "os", day(14), 1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn roster_keeps_enrollment_order() {
  let s = seeded().await;
  let roster = s.fetch_roster("s1".into()).await.unwrap();
  let names: Vec<&str> = roster.iter().map(|e| e.display_name.as_str()).collect();
  assert_eq!(names, ["Asha Rao", "Vikram Iyer"]);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
  let s = seeded().await;
  let err = s.fetch_roster("nope".into()).await.unwrap_err();
  assert!(matches!(
    err,
    GatewayError::Rejected(r) if r.reason == RejectReason::NotFound
  ));

  let err = s.enroll(&"nope".into(), &student("st-9", "X")).await.unwrap_err();
  assert!(matches!(err, Error::SessionNotFound(_)));
}

// ─── Marks ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn marks_overwrite_until_submitted() {
  let s = seeded().await;
  s.persist_mark("s1".into(), "st-1".into(), Status::Absent, day(14))
    .await
    .unwrap();
  s.persist_mark("s1".into(), "st-1".into(), Status::Late, day(14))
    .await
    .unwrap();

  let marks = s.fetch_marks("s1".into(), day(14)).await.unwrap();
  assert_eq!(marks.len(), 1);
  assert_eq!(marks[0].student_id, StudentId::from("st-1"));
  assert_eq!(marks[0].status, Status::Late);
  assert!(!marks[0].committed);
}

#[tokio::test]
async fn mark_for_student_not_enrolled_is_rejected() {
  let s = seeded().await;
  let err = s
    .record_mark(&"s1".into(), &"ghost".into(), Status::Present, day(14))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotEnrolled { .. }));
}

#[tokio::test]
async fn mark_on_wrong_day_is_invalid() {
  let s = seeded().await;
  let err = s
    .persist_mark("s1".into(), "st-1".into(), Status::Present, day(15))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    GatewayError::Rejected(r) if r.reason == RejectReason::Invalid
  ));
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_requires_every_student_marked() {
  let s = seeded().await;
  s.persist_mark("s1".into(), "st-1".into(), Status::Present, day(14))
    .await
    .unwrap();

  let err = s.submit(&"s1".into(), day(14)).await.unwrap_err();
  assert!(matches!(err, Error::Incomplete { missing: 1, .. }));

  let err = GatewayError::from(err);
  assert!(matches!(
    err,
    GatewayError::Rejected(r) if r.reason == RejectReason::Incomplete
  ));
}

#[tokio::test]
async fn submit_locks_and_commits() {
  let s = seeded().await;
  let id = SessionId::from("s1");
  for st in ["st-1", "st-2"] {
    s.persist_mark(id.clone(), st.into(), Status::Present, day(14))
      .await
      .unwrap();
  }
  s.submit_session(id.clone(), day(14)).await.unwrap();

  let marks = s.fetch_marks(id.clone(), day(14)).await.unwrap();
  assert!(marks.iter().all(|m| m.committed));

  let err = s
    .persist_mark(id.clone(), "st-2".into(), Status::Absent, day(14))
    .await
    .unwrap_err();
  assert!(err.is_lock());

  let err = s.submit_session(id, day(14)).await.unwrap_err();
  assert!(err.is_lock());
}

// ─── Student history ─────────────────────────────────────────────────────────

#[tokio::test]
async fn records_include_only_submitted_sessions() {
  let s = store().await;
  let t = teacher();
  let sessions = [
    session("os-1", "os", day(1), 1),
    session("cn-1", "cn", day(2), 1),
    session("os-2", "os", day(3), 1),
  ];
  for sess in &sessions {
    s.add_session(&t, sess).await.unwrap();
    s.enroll(&sess.session_id, &student("st-1", "Asha Rao")).await.unwrap();
  }
  s.record_mark(&"os-1".into(), &"st-1".into(), Status::Present, day(1)).await.unwrap();
  s.record_mark(&"cn-1".into(), &"st-1".into(), Status::Absent, day(2)).await.unwrap();
  s.record_mark(&"os-2".into(), &"st-1".into(), Status::Late, day(3)).await.unwrap();
  s.submit(&"os-1".into(), day(1)).await.unwrap();
  s.submit(&"cn-1".into(), day(2)).await.unwrap();

  let all = s
    .fetch_student_records("st-1".into(), RecordScope::All)
    .await
    .unwrap();
  let ids: Vec<&str> = all.iter().map(|r| r.session_id.as_str()).collect();
  assert_eq!(ids, ["os-1", "cn-1"], "os-2 is still open");

  let os = s
    .fetch_student_records("st-1".into(), RecordScope::Subject("os".into()))
    .await
    .unwrap();
  assert_eq!(os.len(), 1);
  assert_eq!(os[0].status, Status::Present);

  let june = s
    .fetch_student_records("st-1".into(), RecordScope::Month { year: 2025, month: 6 })
    .await
    .unwrap();
  assert!(june.is_empty());
}
