//! Shared constants for end-to-end tests
//!
//! When test data changes (machine names, tool types, timeouts),
//! update only this file.

// ============================================================================
// Shop floor
// ============================================================================

/// Lathe used by most tests
pub const MACHINE_1: &str = "M1";

/// Milling machine with a non-ASCII name
pub const MACHINE_2: &str = "ТСЗ-Ф13 70";

pub const TOOL_TYPE_DRILL: &str = "drill";

pub const TOOL_TYPE_TAP: &str = "tap";

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for a spawned server to answer /api/ping
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
