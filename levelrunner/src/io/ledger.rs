//! Sidecar record of stage ids already accepted by the judge.
//!
//! Plain text, one remote id per line, sorted, newline-terminated. The file is
//! rewritten whole (temp file + rename) so readers never see a partial ledger.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionLedger {
    path: PathBuf,
}

impl SubmissionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the accepted ids.
    ///
    /// Returns the empty set when the file is absent or `force_resubmit` is set.
    pub fn load(&self, force_resubmit: bool) -> Result<BTreeSet<String>, EngineError> {
        if force_resubmit {
            debug!(path = %self.path.display(), "forced resubmission, ignoring ledger");
            return Ok(BTreeSet::new());
        }
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        let ids: BTreeSet<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(path = %self.path.display(), count = ids.len(), "ledger loaded");
        Ok(ids)
    }

    /// Overwrite the ledger with `ids`.
    pub fn save(&self, ids: &BTreeSet<String>) -> Result<(), EngineError> {
        debug!(path = %self.path.display(), count = ids.len(), "writing ledger");
        let mut buf = String::new();
        for id in ids {
            buf.push_str(id);
            buf.push('\n');
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, buf).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp_path, &self.path).map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> EngineError {
        EngineError::LedgerIo {
            path: self.path.clone(),
            source,
        }
    }
}
