//! The attendance-session state machine.
//!
//! [`AttendanceDesk`] ties together a [`SessionSelector`] (which session is
//! active, which sessions are locked) and a [`Ledger`] (the working marks of
//! the selected session), and talks to any
//! [`SyncGateway`](rollcall_core::gateway::SyncGateway) for persistence.

pub mod config;
pub mod desk;
pub mod ledger;
pub mod report;
pub mod selector;

pub use config::DeskConfig;
pub use desk::{AttendanceDesk, PendingWrite};
pub use ledger::{Ledger, LedgerRow, LedgerSnapshot, MarkCell, Tallies};
pub use report::AttendanceReport;
pub use selector::{LockState, LockTable, SessionSelector};
