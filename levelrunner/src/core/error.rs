//! Structural errors raised by the submission engine.
//!
//! These abort a reconciliation pass. Per-stage submission outcomes are not
//! errors; they are recorded as [`Verdict`](crate::core::types::Verdict) values.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Positional stage names could not be zipped with the local input stems.
    #[error("catalog mismatch: local inputs {local:?} cannot be matched with remote stages {remote:?}")]
    CatalogMismatch {
        local: Vec<String>,
        remote: Vec<String>,
    },

    /// Level metadata from the judge failed validation.
    #[error("invalid level info: {0}")]
    InvalidLevelInfo(String),

    /// The ledger sidecar could not be read or written.
    #[error("ledger I/O failure at {}", .path.display())]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The level has no output directory yet.
    #[error("{} does not exist, maybe next-level?", .0.display())]
    MissingOutputDir(PathBuf),
}
