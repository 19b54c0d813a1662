//! Error types shared across the crate.
//!
//! Per-mirror failures (bad HEAD response, broken connection, wrong HTTP
//! status) are never represented here: the coordinator always recovers from
//! them by dropping the offending mirror and reporting through [`Console`].
//! Only the errors the process can't recover from are typed.
//!
//! [`Console`]: crate::console::Console

use std::path::PathBuf;

use thiserror::Error;

pub use crate::url::UrlError;

/// Errors raised while preparing or opening the output file.
#[derive(Debug, Error)]
pub enum OutfileError {
    #[error("{path} is a file, expected a directory")]
    DirIsFile { path: PathBuf },

    #[error("unable to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to open file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutfileError {
    pub fn dir_is_file(path: impl Into<PathBuf>) -> Self {
        Self::DirIsFile { path: path.into() }
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    pub fn create_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateFile {
            path: path.into(),
            source,
        }
    }

    pub fn open_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OpenFile {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort the whole download, surfaced out of [`Manager::download`].
///
/// [`Manager::download`]: crate::manager::Manager::download
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No mirror remains usable (none parsed, or all were dropped on error).
    #[error("{0}")]
    Fatal(String),

    /// The file on disk could not be prepared or written to.
    #[error(transparent)]
    Outfile(#[from] OutfileError),

    /// The user declined a prompt (overwrite file, create directory, ...).
    #[error("download cancelled")]
    Cancel,

    /// Mirrors disagree about the file's size.
    #[error("file size mismatch between mirrors")]
    FileSize,
}

/// Errors raised while parsing command-line arguments or a `--urls-file`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("wrong value for {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("permission denied reading {path}")]
    PermissionDenied { path: PathBuf },

    #[error("{path} is not a valid text file")]
    CorruptedFile { path: PathBuf },

    #[error("no mirror URLs given")]
    NoUrls,
}

// No From<std::io::Error> for OutfileError: every IO failure needs the path
// it happened on, which the source error doesn't carry. Callers use the
// constructor methods above instead.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn outfile_error_messages_include_path() {
        let err = OutfileError::dir_is_file("/tmp/foo");
        assert!(err.to_string().contains("/tmp/foo"));
    }

    #[test]
    fn manager_error_fatal_passes_message_through() {
        let err = ManagerError::Fatal("no mirrors left".to_string());
        assert_eq!(err.to_string(), "no mirrors left");
    }

    #[test]
    fn manager_error_wraps_outfile_error() {
        let io_err = std::io::Error::other("denied");
        let outfile_err = OutfileError::write("/tmp/out", io_err);
        let manager_err: ManagerError = outfile_err.into();
        assert!(manager_err.to_string().contains("/tmp/out"));
    }
}
