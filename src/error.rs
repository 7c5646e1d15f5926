use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Subgen's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Subgen's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs. The discovery variants exist because the CLI
/// reports "nothing found" differently from "something broke".
#[derive(Debug, Error)]
pub enum Error {
    /// A recursive walk of the directory found no valid media files.
    ///
    /// Distinct from an empty candidate list: "nothing there" and "nothing matched"
    /// are reported differently to the user.
    #[error("no valid media files found in directory '{}'", .0.display())]
    NoMediaInDirectory(PathBuf),

    /// A single file passed on the command line did not probe as media.
    #[error("'{}' is not a valid media file", .0.display())]
    NotAMediaFile(PathBuf),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
