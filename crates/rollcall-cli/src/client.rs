//! Async HTTP client wrapping the rollcall JSON API as a [`SyncGateway`].

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use anyhow::Context as _;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rollcall_core::{
  gateway::{GatewayError, GatewayResult, RejectReason, SyncGateway},
  mark::{RemoteMark, Status},
  record::{AttendanceRecord, RecordScope},
  roster::{RosterEntry, StudentId},
  session::{ActorId, Session, SessionId},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Supplies the bearer token for each request and is told when the server
/// refuses it. Token acquisition and refresh live behind this trait.
pub trait Credentials: Send + Sync {
  fn token(&self) -> Option<String>;

  fn on_unauthorized(&self);
}

/// A fixed token from flags, environment or config file.
#[derive(Debug, Default)]
pub struct StaticToken {
  token:    Option<String>,
  rejected: AtomicBool,
}

impl StaticToken {
  pub fn new(token: Option<String>) -> Self {
    Self { token, rejected: AtomicBool::new(false) }
  }

  /// Whether the server has refused this token at least once.
  pub fn was_rejected(&self) -> bool { self.rejected.load(Ordering::Relaxed) }
}

impl Credentials for StaticToken {
  fn token(&self) -> Option<String> { self.token.clone() }

  fn on_unauthorized(&self) {
    if !self.rejected.swap(true, Ordering::Relaxed) {
      tracing::warn!(has_token = self.token.is_some(), "server rejected credentials");
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Error body returned by the API for every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  error:  String,
  #[serde(default)]
  reason: Option<RejectReason>,
}

/// HTTP implementation of [`SyncGateway`] for the rollcall JSON API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpGateway {
  client:      Client,
  base_url:    String,
  credentials: Arc<dyn Credentials>,
}

impl HttpGateway {
  pub fn new(base_url: impl Into<String>, credentials: Arc<dyn Credentials>) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into(), credentials })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match self.credentials.token() {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Send `req`, turning transport failures and non-2xx statuses into
  /// [`GatewayError`]s.
  async fn send(&self, req: RequestBuilder) -> GatewayResult<Response> {
    let resp = self
      .auth(req)
      .send()
      .await
      .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let body = resp.json::<ErrorBody>().await.ok();
    let message = body
      .as_ref()
      .map_or_else(|| status.to_string(), |b| b.error.clone());

    if status == StatusCode::UNAUTHORIZED {
      self.credentials.on_unauthorized();
      return Err(GatewayError::rejected(RejectReason::Unauthorized, message));
    }
    if status.is_server_error() {
      return Err(GatewayError::Unavailable(format!("{status}: {message}")));
    }
    let reason = body.and_then(|b| b.reason).unwrap_or(match status {
      StatusCode::NOT_FOUND => RejectReason::NotFound,
      _ => RejectReason::Invalid,
    });
    Err(GatewayError::rejected(reason, message))
  }

  async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> GatewayResult<T> {
    self
      .send(req)
      .await?
      .json()
      .await
      .map_err(|e| GatewayError::Unavailable(format!("malformed response: {e}")))
  }
}

fn scope_query(scope: &RecordScope) -> Vec<(&'static str, String)> {
  match scope {
    RecordScope::All => Vec::new(),
    RecordScope::Month { year, month } => {
      vec![("year", year.to_string()), ("month", month.to_string())]
    }
    RecordScope::Subject(id) => vec![("subject_id", id.to_string())],
  }
}

// ─── SyncGateway impl ────────────────────────────────────────────────────────

impl SyncGateway for HttpGateway {
  /// `GET /api/schedule?actor_id=<id>&date=<day>`
  async fn fetch_schedule(&self, actor: ActorId, date: NaiveDate) -> GatewayResult<Vec<Session>> {
    let req = self
      .client
      .get(self.url("/schedule"))
      .query(&[("actor_id", actor.to_string()), ("date", date.to_string())]);
    self.get_json(req).await
  }

  /// `GET /api/sessions/<id>/roster`
  async fn fetch_roster(&self, session_id: SessionId) -> GatewayResult<Vec<RosterEntry>> {
    let req = self
      .client
      .get(self.url(&format!("/sessions/{session_id}/roster")));
    self.get_json(req).await
  }

  /// `GET /api/sessions/<id>/marks?date=<day>`
  async fn fetch_marks(
    &self,
    session_id: SessionId,
    date: NaiveDate,
  ) -> GatewayResult<Vec<RemoteMark>> {
    let req = self
      .client
      .get(self.url(&format!("/sessions/{session_id}/marks")))
      .query(&[("date", date.to_string())]);
    self.get_json(req).await
  }

  /// `POST /api/sessions/<id>/marks`
  async fn persist_mark(
    &self,
    session_id: SessionId,
    student_id: StudentId,
    status: Status,
    date: NaiveDate,
  ) -> GatewayResult<()> {
    let req = self
      .client
      .post(self.url(&format!("/sessions/{session_id}/marks")))
      .json(&json!({ "student_id": student_id, "status": status, "date": date }));
    self.send(req).await?;
    Ok(())
  }

  /// `POST /api/sessions/<id>/submit`
  async fn submit_session(&self, session_id: SessionId, date: NaiveDate) -> GatewayResult<()> {
    let req = self
      .client
      .post(self.url(&format!("/sessions/{session_id}/submit")))
      .json(&json!({ "date": date }));
    self.send(req).await?;
    Ok(())
  }

  /// `GET /api/students/<id>/records[?year&month|?subject_id]`
  async fn fetch_student_records(
    &self,
    student_id: StudentId,
    scope: RecordScope,
  ) -> GatewayResult<Vec<AttendanceRecord>> {
    let req = self
      .client
      .get(self.url(&format!("/students/{student_id}/records")))
      .query(&scope_query(&scope));
    self.get_json(req).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rollcall_core::session::SessionKind;
  use rollcall_desk::{AttendanceDesk, DeskConfig};
  use rollcall_store_sqlite::SqliteStore;
  use tokio::net::TcpListener;

  use super::*;

  fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 7, 14).unwrap() }

  /// Serve the real API over a seeded in-memory store on an ephemeral port.
  async fn serve(api_token: Option<&str>) -> String {
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

    let app = rollcall_api::app(Arc::new(store), api_token);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  fn gateway(url: &str, token: Option<&str>) -> (HttpGateway, Arc<StaticToken>) {
    let creds = Arc::new(StaticToken::new(token.map(str::to_owned)));
    let gw = HttpGateway::new(url, creds.clone()).unwrap();
    (gw, creds)
  }

  #[test]
  fn scope_is_spelled_as_query_params() {
    assert!(scope_query(&RecordScope::All).is_empty());
    assert_eq!(
      scope_query(&RecordScope::Month { year: 2025, month: 7 }),
      vec![("year", "2025".to_string()), ("month", "7".to_string())]
    );
  }

  #[tokio::test]
  async fn unreachable_server_is_unavailable() {
    let (gw, _) = gateway("http://127.0.0.1:9", None);
    let err = gw.fetch_roster("s1".into()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
  }

  #[tokio::test]
  async fn rejections_keep_their_reason() {
    let url = serve(None).await;
    let (gw, _) = gateway(&url, None);

    let err = gw.fetch_roster("nope".into()).await.unwrap_err();
    assert!(matches!(&err, GatewayError::Rejected(r) if r.reason == RejectReason::NotFound));

    let err = gw.submit_session("s1".into(), day()).await.unwrap_err();
    assert!(matches!(&err, GatewayError::Rejected(r) if r.reason == RejectReason::Incomplete));
  }

  #[tokio::test]
  async fn bad_token_notifies_credentials() {
    let url = serve(Some("s3cret")).await;
    let (gw, creds) = gateway(&url, Some("wrong"));

    let err = gw.fetch_roster("s1".into()).await.unwrap_err();
    assert!(matches!(&err, GatewayError::Rejected(r) if r.reason == RejectReason::Unauthorized));
    assert!(creds.was_rejected());

    let (gw, creds) = gateway(&url, Some("s3cret"));
    assert_eq!(gw.fetch_roster("s1".into()).await.unwrap().len(), 2);
    assert!(!creds.was_rejected());
  }

  #[tokio::test]
  async fn desk_round_trip_over_http() {
    let url = serve(None).await;
    let (gw, _) = gateway(&url, None);
    let desk = AttendanceDesk::new(Arc::new(gw), "t-01".into(), day(), &DeskConfig::default());

    let sessions = desk.refresh_schedule(day()).await.unwrap();
    assert_eq!(sessions.len(), 1);
    let first = desk.first_session().await.unwrap();
    desk.select_session(&first.session_id).await.unwrap();

    for (student, status) in [("st-1", Status::Present), ("st-2", Status::Absent)] {
      desk
        .set_status(&student.into(), status)
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();
    }
    desk.submit().await.unwrap().settled().await.unwrap();
    assert!(desk.is_locked(&"s1".into()).await);

    let report = desk.student_report(&"st-2".into()).await.unwrap();
    assert_eq!(report.overall.total_sessions, 1);
    assert_eq!(report.overall.present_count, 0);
  }
}
