//! Error types for the floxer alignment core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur anywhere in the floxer-core pipeline.
///
/// The four kinds mirror the error taxonomy of the underlying
/// research prototype: malformed input, contradictory configuration,
/// a broken on-disk index, or an internal invariant violation.
#[derive(Debug, Error)]
pub enum FloxerError {
    #[error("input error: {message}{}", path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Input {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("index error: {message}{}", path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Index {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("internal error: {message}")]
    Runtime { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FloxerError {
    pub fn input<S: Into<String>>(message: S) -> Self {
        Self::Input {
            message: message.into(),
            path: None,
        }
    }

    pub fn input_at<S: Into<String>>(message: S, path: PathBuf) -> Self {
        Self::Input {
            message: message.into(),
            path: Some(path),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn index<S: Into<String>>(message: S) -> Self {
        Self::Index {
            message: message.into(),
            path: None,
        }
    }

    pub fn index_at<S: Into<String>>(message: S, path: PathBuf) -> Self {
        Self::Index {
            message: message.into(),
            path: Some(path),
        }
    }

    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

pub type FloxerResult<T> = Result<T, FloxerError>;
