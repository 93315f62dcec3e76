//! Router tests against an in-memory SQLite gateway.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::NaiveDate;
use rollcall_core::{
  roster::RosterEntry,
  session::{Session, SessionKind},
};
use rollcall_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::app;

fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 7, 14).unwrap() }

async fn seeded_store() -> SqliteStore {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let session = Session {
    session_id:     "s1".into(),
    subject_id:     "os".into(),
    subject_name:   "Operating Systems".into(),
    kind:           SessionKind::Lecture,
    date:           day(),
    lecture_number: 1,
    batch_id:       None,
    class_name:     "SE".into(),
    division:       "A".into(),
  };
  store.add_session(&"t-01".into(), &session).await.unwrap();
  for (id, name) in [("st-1", "Asha Rao"), ("st-2", "Vikram Iyer")] {
    let entry = RosterEntry {
      student_id:   id.into(),
      display_name: name.into(),
      class_name:   "SE".into(),
      division:     "A".into(),
    };
    store.enroll(&"s1".into(), &entry).await.unwrap();
  }
  store
}

async fn router() -> Router { app(Arc::new(seeded_store().await), None) }

async fn send(
  router: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = router
    .clone()
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn mark(student: &str, status: &str) -> Value {
  json!({ "student_id": student, "status": status, "date": "2025-07-14" })
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schedule_lists_the_actors_sessions() {
  let r = router().await;
  let (status, body) =
    send(&r, "GET", "/api/schedule?actor_id=t-01&date=2025-07-14", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["session_id"], "s1");
  assert_eq!(body[0]["kind"], "lecture");

  let (_, body) =
    send(&r, "GET", "/api/schedule?actor_id=t-02&date=2025-07-14", None).await;
  assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unknown_session_roster_is_404() {
  let r = router().await;
  let (status, body) = send(&r, "GET", "/api/sessions/nope/roster", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["reason"], "not_found");
}

// ─── Marks & submission ──────────────────────────────────────────────────────

#[tokio::test]
async fn recorded_marks_are_listed() {
  let r = router().await;
  let (status, _) = send(&r, "POST", "/api/sessions/s1/marks", Some(mark("st-2", "Late"))).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = send(&r, "GET", "/api/sessions/s1/marks?date=2025-07-14", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!([{ "student_id": "st-2", "status": "Late", "committed": false }])
  );
}

#[tokio::test]
async fn incomplete_submit_is_409() {
  let r = router().await;
  send(&r, "POST", "/api/sessions/s1/marks", Some(mark("st-1", "Present"))).await;

  let (status, body) = send(
    &r,
    "POST",
    "/api/sessions/s1/submit",
    Some(json!({ "date": "2025-07-14" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "incomplete");
}

#[tokio::test]
async fn submitted_session_refuses_marks() {
  let r = router().await;
  send(&r, "POST", "/api/sessions/s1/marks", Some(mark("st-1", "Present"))).await;
  send(&r, "POST", "/api/sessions/s1/marks", Some(mark("st-2", "Absent"))).await;

  let submit = Some(json!({ "date": "2025-07-14" }));
  let (status, _) = send(&r, "POST", "/api/sessions/s1/submit", submit.clone()).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) =
    send(&r, "POST", "/api/sessions/s1/marks", Some(mark("st-2", "Present"))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "already_locked");

  let (status, body) = send(&r, "POST", "/api/sessions/s1/submit", submit).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "already_locked");

  let (_, body) = send(&r, "GET", "/api/students/st-2/records", None).await;
  assert_eq!(body[0]["status"], "Absent");
}

#[tokio::test]
async fn mixed_record_scope_is_400() {
  let r = router().await;
  let (status, body) = send(
    &r,
    "GET",
    "/api/students/st-1/records?year=2025&month=7&subject_id=os",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["reason"], "invalid");
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_is_required_when_configured() {
  let r = app(Arc::new(seeded_store().await), Some("s3cret"));

  let (status, body) = send(&r, "GET", "/api/sessions/s1/roster", None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["reason"], "unauthorized");

  let req = Request::builder()
    .uri("/api/sessions/s1/roster")
    .header(header::AUTHORIZATION, "Bearer s3cret")
    .body(Body::empty())
    .unwrap();
  let resp = r.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
}
