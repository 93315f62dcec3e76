//! Core types and trait definitions for rollcall.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the attendance data model, the [`gateway::SyncGateway`] contract that every
//! backend implements, and the pure aggregation functions used to build
//! student statistics.

pub mod aggregate;
pub mod error;
pub mod gateway;
pub mod mark;
pub mod record;
pub mod roster;
pub mod session;

pub use error::{Error, Result};
