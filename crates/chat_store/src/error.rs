use std::path::PathBuf;

use thiserror::Error;

use crate::schema::ChatMode;

#[derive(Debug, Error)]
pub enum ChatStoreError {
    #[error("I/O error while {operation} at {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while reading line {line} in {}: {source}", .path.display())]
    IoLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON at {}:{line}: {source}", .path.display())]
    JsonLineParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize chat record for {}: {source}", .path.display())]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing chat header line in {}", .path.display())]
    MissingHeader { path: PathBuf },

    #[error("line {line} in {} must be a chat header record", .path.display())]
    InvalidHeaderRecord { path: PathBuf, line: usize },

    #[error("line {line} in {} must be a turn record", .path.display())]
    InvalidTurnRecord { path: PathBuf, line: usize },

    #[error("line {line} in {} has unsupported chat version {found}; expected 1", .path.display())]
    UnsupportedVersion {
        path: PathBuf,
        line: usize,
        found: u32,
    },

    #[error(
        "line {line} in {} has invalid RFC3339 timestamp in field '{field}': {value}",
        .path.display()
    )]
    InvalidTimestamp {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("chat id must not be empty")]
    EmptyChatId,

    #[error("no chat stored under id '{chat_id}'")]
    NotFound { chat_id: String },

    #[error(
        "chat at {} was created in {stored} mode, cannot open as {requested}",
        .path.display()
    )]
    HeaderModeMismatch {
        path: PathBuf,
        stored: ChatMode,
        requested: ChatMode,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl ChatStoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn io_line(path: impl Into<PathBuf>, line: usize, source: std::io::Error) -> Self {
        Self::IoLine {
            path: path.into(),
            line,
            source,
        }
    }

    #[must_use]
    pub fn json_line(path: impl Into<PathBuf>, line: usize, source: serde_json::Error) -> Self {
        Self::JsonLineParse {
            path: path.into(),
            line,
            source,
        }
    }

    #[must_use]
    pub fn json_serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::JsonSerialize {
            path: path.into(),
            source,
        }
    }
}
