//! Stage reconciliation and idempotent submission for level-based contests.
//!
//! A contest level consists of stages; a solver writes one output artifact per
//! stage and this crate submits them to the judge, remembers what was accepted,
//! and moves on to the next level once every stage passes.
//!
//! - **[`core`]**: Pure, deterministic logic (catalog, reconciliation,
//!   completion decision). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (ledger file, config, judge HTTP
//!   client, git, archives, level workspaces).
//!
//! Orchestration modules ([`submitter`], [`pass`], [`advance`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod advance;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pass;
pub mod submitter;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
