//! Stable exit codes for levelrunner CLI commands.

/// Command succeeded and every attempted stage was accepted.
pub const OK: i32 = 0;
/// Command failed due to invalid config, catalog mismatch, ledger I/O, judge or git errors.
pub const INVALID: i32 = 1;
/// At least one attempted stage was rejected or hit a transport failure.
pub const REJECTED: i32 = 2;
