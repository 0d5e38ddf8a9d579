//! Error types for the calsieve pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage, used to give log lines and errors their context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Fetch,
    Parse,
    Filter,
    Serialize,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Filter => "filter",
            Stage::Serialize => "serialize",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while republishing a feed.
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetching {url} failed with HTTP {status}: {body}")]
    Fetch {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("ICS parse error ({bytes} bytes received): {reason}")]
    Parse { reason: String, bytes: usize },

    #[error("Could not write {}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SieveError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            SieveError::Config(_) => Stage::Config,
            SieveError::Fetch { .. } | SieveError::Transport { .. } => Stage::Fetch,
            SieveError::Parse { .. } => Stage::Parse,
            SieveError::Publish { .. } => Stage::Publish,
        }
    }

    pub(crate) fn publish(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SieveError::Publish {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for calsieve operations.
pub type SieveResult<T> = Result<T, SieveError>;
