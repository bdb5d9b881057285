//! Errors for the `floxer` binary: wraps `floxer-core`'s `FloxerError`
//! plus the IO/clap/toml errors that only the CLI layer can produce,
//! the same shape the teacher's own `CliError` uses.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{}", .source)]
    Core {
        #[source]
        source: floxer_core::FloxerError,
    },

    #[error("IO error{}: {source}", .path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Io {
        #[source]
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("argument error: {0}")]
    Args(#[from] clap::Error),
}

impl From<floxer_core::FloxerError> for CliError {
    fn from(source: floxer_core::FloxerError) -> Self {
        Self::Core { source }
    }
}

impl From<floxer_core::alignment::AlignmentError> for CliError {
    fn from(source: floxer_core::alignment::AlignmentError) -> Self {
        Self::Core { source: floxer_core::FloxerError::runtime(source.to_string()) }
    }
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}

pub type CliResult<T> = Result<T, CliError>;
