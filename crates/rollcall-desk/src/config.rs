//! Tuning knobs for [`AttendanceDesk`](crate::AttendanceDesk).

use serde::Deserialize;

/// Desk settings, usually embedded in a binary's config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
  /// Locked sessions older than this many days are forgotten when the
  /// schedule rolls over to a new date.
  pub lock_retention_days: u32,
}

impl Default for DeskConfig {
  fn default() -> Self { Self { lock_retention_days: 7 } }
}
