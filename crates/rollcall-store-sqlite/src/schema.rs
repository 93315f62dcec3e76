//! SQL schema for the rollcall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sessions (
    session_id     TEXT PRIMARY KEY,
    teacher_id     TEXT NOT NULL,
    subject_id     TEXT NOT NULL,
    subject_name   TEXT NOT NULL,
    kind           TEXT NOT NULL,             -- 'lecture' | 'practical'
    date           TEXT NOT NULL,             -- YYYY-MM-DD
    lecture_number INTEGER NOT NULL,
    batch_id       TEXT NOT NULL DEFAULT '',  -- '' when not split into batches
    class_name     TEXT NOT NULL,
    division       TEXT NOT NULL,
    UNIQUE (date, subject_id, lecture_number, batch_id)
);

CREATE TABLE IF NOT EXISTS students (
    student_id   TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    class_name   TEXT NOT NULL,
    division     TEXT NOT NULL
);

-- Roster order is enrollment order (rowid).
CREATE TABLE IF NOT EXISTS enrollments (
    session_id TEXT NOT NULL REFERENCES sessions(session_id),
    student_id TEXT NOT NULL REFERENCES students(student_id),
    PRIMARY KEY (session_id, student_id)
);

-- At most one mark per (session, student); overwritten until submission.
CREATE TABLE IF NOT EXISTS marks (
    session_id  TEXT NOT NULL,
    student_id  TEXT NOT NULL,
    status      TEXT NOT NULL,   -- 'present' | 'late' | 'absent'
    recorded_at TEXT NOT NULL,   -- RFC 3339 UTC
    PRIMARY KEY (session_id, student_id),
    FOREIGN KEY (session_id, student_id)
        REFERENCES enrollments(session_id, student_id)
);

-- Append-only. A row here means the session is locked and its marks are
-- committed; no UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS submissions (
    session_id   TEXT PRIMARY KEY REFERENCES sessions(session_id),
    submitted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_teacher_day_idx ON sessions(teacher_id, date);
CREATE INDEX IF NOT EXISTS marks_student_idx        ON marks(student_id);

PRAGMA user_version = 1;
";
