//! Failure kinds (§7). All failures are return values; there is no ambient
//! exception mechanism. `unsolvable` / `limit_reached` / `stuck_iteration`
//! are success-path outcomes (see [`crate::solver::SolveStatus`]), not
//! errors — they belong here only as documentation anchors, not variants.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("persisted cache file is corrupt: {0}")]
    PersistenceCorrupt(String),
}
