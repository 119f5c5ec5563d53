//! Error types for the builder.
//!
//! Every failure stops the pipeline; the variants only say which phase
//! gave up and why.

use std::path::PathBuf;
use thiserror::Error;

use crate::builder::process::CommandError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can stop a build.
#[derive(Debug, Error)]
pub enum Error {
    /// The MSVC developer environment is not active.
    #[error(
        "this must run in a Visual Studio Developer Command Prompt (missing: {})",
        .missing.join(", ")
    )]
    Toolchain { missing: Vec<String> },

    #[error("invalid pin file {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("failed to fetch {name}")]
    Fetch {
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("{component}: {step} failed")]
    Build {
        component: &'static str,
        step: String,
        #[source]
        source: BuildError,
    },

    #[error("failed to package distribution at {}", .path.display())]
    Package {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single dependency could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("download failed")]
    Http(#[from] reqwest::Error),

    #[error("unreadable zip archive")]
    Zip(#[from] zip::result::ZipError),

    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),

    #[error("archive entry {} would land outside the destination", .0.display())]
    UnsafeEntry(PathBuf),

    #[error("checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a single toolchain step failed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("expected {} to exist", .0.display())]
    Missing(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
