use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading benchmark logs, resource reports and chart requests.
///
/// Missing files and unmatched labels are not errors: they aggregate to an
/// absent value. Only data that is present but unreadable ends up here.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("{path}:{line}: malformed value: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("invalid chart request: {0}")]
    InvalidRequest(String),
}

impl DataError {
    pub(crate) fn malformed(path: &std::path::Path, line: usize, reason: impl Into<String>) -> Self {
        DataError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}

pub type DataResult<T> = std::result::Result<T, DataError>;
