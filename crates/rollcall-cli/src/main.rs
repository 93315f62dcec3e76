//! `rollcall`: take attendance from the terminal.
//!
//! # Usage
//!
//! ```
//! rollcall --actor t-01 schedule
//! rollcall --actor t-01 show --session s1 --search rao
//! rollcall --actor t-01 mark st-2 absent --session s1
//! rollcall --actor t-01 submit
//! rollcall --actor t-01 show
//! rollcall stats st-2
//! rollcall --config ~/.config/rollcall/config.toml schedule
//! ```

mod client;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client::{HttpGateway, StaticToken};
use rollcall_core::{
  Error,
  mark::Status,
  roster::StudentId,
  session::{ActorId, SessionId},
};
use rollcall_desk::{AttendanceDesk, AttendanceReport, DeskConfig, LedgerRow, LedgerSnapshot};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rollcall", about = "Take and review attendance")]
struct Args {
  /// Path to a TOML config file (url, token, actor, desk settings).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the rollcall server (default: http://localhost:5240).
  #[arg(long, env = "ROLLCALL_URL")]
  url: Option<String>,

  /// Bearer token for the API.
  #[arg(long, env = "ROLLCALL_TOKEN")]
  token: Option<String>,

  /// Teacher on whose behalf sessions are listed and marked.
  #[arg(long, env = "ROLLCALL_ACTOR")]
  actor: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List the day's sessions.
  Schedule {
    /// Day to list (default: today).
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Show a session's roster with current statuses and tallies.
  Show {
    /// Session to open (default: the day's first session).
    #[arg(short, long)]
    session: Option<String>,
    #[arg(long)]
    date:    Option<NaiveDate>,
    /// Only list students whose name or id matches.
    #[arg(long)]
    search:  Option<String>,
  },
  /// Set one student's status (present, late or absent).
  Mark {
    student: String,
    status:  Status,
    #[arg(short, long)]
    session: Option<String>,
    #[arg(long)]
    date:    Option<NaiveDate>,
  },
  /// Lock a session once every student has been marked.
  Submit {
    #[arg(short, long)]
    session: Option<String>,
    #[arg(long)]
    date:    Option<NaiveDate>,
  },
  /// Attendance statistics for one student.
  Stats { student: String },
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:   String,
  #[serde(default)]
  token: String,
  #[serde(default)]
  actor: String,
  #[serde(default)]
  desk:  DeskConfig,
}

fn non_empty(s: &str) -> Option<String> { (!s.is_empty()).then(|| s.to_owned()) }

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let url = args
    .url
    .or_else(|| non_empty(&file_cfg.url))
    .unwrap_or_else(|| "http://localhost:5240".to_string());
  let token = args.token.or_else(|| non_empty(&file_cfg.token));
  let actor: ActorId = args
    .actor
    .or_else(|| non_empty(&file_cfg.actor))
    .unwrap_or_default()
    .as_str()
    .into();

  let credentials = Arc::new(StaticToken::new(token));
  let gateway = HttpGateway::new(url, credentials.clone())?;
  let today = chrono::Local::now().date_naive();
  let desk = AttendanceDesk::new(Arc::new(gateway), actor, today, &file_cfg.desk);

  let result = run(&desk, args.command, today).await;
  if result.is_err() && credentials.was_rejected() {
    eprintln!("hint: the server refused the token; check --token or ROLLCALL_TOKEN");
  }
  result
}

async fn run(desk: &AttendanceDesk<HttpGateway>, command: Command, today: NaiveDate) -> Result<()> {
  match command {
    Command::Schedule { date } => {
      require_actor(desk)?;
      let date = date.unwrap_or(today);
      let sessions = desk.refresh_schedule(date).await?;
      if sessions.is_empty() {
        println!("No sessions on {date}.");
      }
      for session in sessions {
        println!(
          "{:<12} {}  {}-{}",
          session.session_id.as_str(),
          session.label(),
          session.class_name,
          session.division
        );
      }
    }

    Command::Show { session, date, search } => {
      let snapshot = open_session(desk, session, date.unwrap_or(today)).await?;
      let rows = match search {
        Some(query) => desk.search(&query).await,
        None => snapshot.rows.clone(),
      };
      print_rows(&rows);
      print_summary(&snapshot);
    }

    Command::Mark { session, student, status, date } => {
      open_session(desk, session, date.unwrap_or(today)).await?;
      let student = StudentId::from(student);
      desk.set_status(&student, status).await?.settled().await?;
      println!("{student}: {status}");
    }

    Command::Submit { session, date } => {
      let snapshot = open_session(desk, session, date.unwrap_or(today)).await?;
      match desk.submit().await {
        Ok(pending) => pending.settled().await?,
        Err(Error::IncompleteRoster { missing }) => {
          let ids: Vec<&str> = missing.iter().map(StudentId::as_str).collect();
          bail!("cannot submit, unmarked: {}", ids.join(", "));
        }
        Err(e) => return Err(e.into()),
      }
      println!("Session {} submitted.", snapshot.session_id);
    }

    Command::Stats { student } => {
      let report = desk.student_report(&StudentId::from(student)).await?;
      print_report(&report);
    }
  }
  Ok(())
}

fn require_actor(desk: &AttendanceDesk<HttpGateway>) -> Result<()> {
  if desk.actor().to_string().is_empty() {
    bail!("no actor configured; pass --actor or set ROLLCALL_ACTOR");
  }
  Ok(())
}

/// Load `date`'s schedule and select `session`, or the day's first session
/// when none is named.
async fn open_session(
  desk: &AttendanceDesk<HttpGateway>,
  session: Option<String>,
  date: NaiveDate,
) -> Result<LedgerSnapshot> {
  require_actor(desk)?;
  desk.refresh_schedule(date).await?;
  let id = match session {
    Some(session) => SessionId::from(session),
    None => match desk.first_session().await {
      Some(first) => first.session_id,
      None => bail!("no sessions on {date}"),
    },
  };
  desk
    .select_session(&id)
    .await
    .with_context(|| format!("opening session {id} on {date}"))
}

// ─── Output ──────────────────────────────────────────────────────────────────

fn print_rows(rows: &[LedgerRow]) {
  for row in rows {
    let marker = if row.pending {
      "…"
    } else if row.explicit {
      " "
    } else {
      "*"
    };
    println!(
      "{:<12} {:<28} {}{marker}",
      row.student_id.as_str(), row.display_name, row.status
    );
  }
}

fn print_summary(snapshot: &LedgerSnapshot) {
  let t = &snapshot.tallies;
  println!(
    "\npresent {}  late {}  absent {}  total {}",
    t.present, t.late, t.absent, t.total
  );
  if snapshot.committed {
    println!("Submitted; marks are final.");
  } else if snapshot.rows.iter().any(|r| !r.explicit) {
    println!("* not yet marked (shown as {})", Status::DISPLAY_DEFAULT);
  }
}

fn print_report(report: &AttendanceReport) {
  let overall = &report.overall;
  println!(
    "Overall: {}% ({} of {} sessions) - {}",
    overall.display_percentage(),
    overall.present_count,
    overall.total_sessions,
    report.band
  );

  if !report.monthly.is_empty() {
    println!("\nBy month:");
    for m in &report.monthly {
      println!(
        "  {:<10} {:>3}%  ({}/{})",
        m.month.to_string(),
        m.aggregate.display_percentage(),
        m.aggregate.present_count,
        m.aggregate.total_sessions
      );
    }
  }

  if !report.by_subject.is_empty() {
    println!("\nBy subject:");
    for s in &report.by_subject {
      println!(
        "  {:<28} {:>3}%  ({}/{})  {}",
        s.subject_name,
        s.aggregate.display_percentage(),
        s.aggregate.present_count,
        s.aggregate.total_sessions,
        s.aggregate.band()
      );
    }
  }
}
