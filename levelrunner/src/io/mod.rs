//! I/O adapters for the submission engine.

pub mod archive;
pub mod config;
pub mod git;
pub mod judge;
pub mod ledger;
pub mod paths;
pub mod workspace;
