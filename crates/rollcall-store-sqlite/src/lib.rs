//! SQLite backend for rollcall.
//!
//! [`SqliteStore`] is the authoritative side of the
//! [`SyncGateway`](rollcall_core::gateway::SyncGateway) contract: it refuses
//! marks for submitted sessions and runs its own completeness check on
//! submit. All database access goes through [`tokio_rusqlite`], so queries run
//! on a dedicated thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
