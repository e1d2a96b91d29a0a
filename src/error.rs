//! Error types for configuration loading and score persistence
//!
//! The simulation itself never fails; only the edges that touch the
//! filesystem return these.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate a `Ruleset`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read ruleset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse ruleset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid ruleset: {0}")]
    Invalid(String),
}

/// Failure to load or save the high score file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("high score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode high scores: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode high scores: {0}")]
    Decode(#[source] serde_json::Error),
}
