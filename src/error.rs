use crate::spreadsheet::SpreadsheetError;
use std::fmt;
use std::fmt::Display;
use thiserror::Error;

/// Coarse error classes surfaced in a failed load status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Io,
    Decode,
    Encode,
    Cache,
    Config,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Io => "io",
            ErrorKind::Decode => "decode",
            ErrorKind::Encode => "encode",
            ErrorKind::Cache => "cache",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Main error type for the coil lookup library.
/// Aggregates errors from the network, file system, codec, cache and configuration layers.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{message}")]
    WithContextError { kind: ErrorKind, message: String },

    // Source errors
    #[error("Request to '{url}' failed: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to '{url}' returned HTTP status {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Cannot access '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Spreadsheet module errors
    #[error("Cannot read spreadsheet '{label}': {source}")]
    DecodeError {
        label: String,
        #[source]
        source: SpreadsheetError,
    },

    #[error("{0}")]
    EncodeError(SpreadsheetError),

    // Cache errors
    #[error("{0}")]
    CacheError(#[from] duckdb::Error),

    #[error("{0}")]
    CachePayloadError(#[from] serde_json::Error),

    // Configuration errors
    #[error("{0}")]
    ConfigError(String),

    #[error("{0}")]
    ConfigFormatError(#[from] toml::de::Error),

    #[error("{0}")]
    UrlError(#[from] url::ParseError),
}

impl LookupError {
    /// Classifies the error for status reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::WithContextError { kind, .. } => *kind,
            LookupError::NetworkError { .. } | LookupError::HttpStatusError { .. } => ErrorKind::Network,
            LookupError::IoError { .. } => ErrorKind::Io,
            LookupError::DecodeError { .. } => ErrorKind::Decode,
            LookupError::EncodeError(_) => ErrorKind::Encode,
            LookupError::CacheError(_) | LookupError::CachePayloadError(_) => ErrorKind::Cache,
            LookupError::ConfigError(_) | LookupError::ConfigFormatError(_) | LookupError::UrlError(_) => {
                ErrorKind::Config
            }
        }
    }

    pub(crate) fn io(path: impl Display, source: std::io::Error) -> Self {
        LookupError::IoError {
            path: path.to_string(),
            source,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, LookupError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| LookupError::WithContextError {
            kind: e.kind(),
            message: format!("{}: {}", message, e),
        })
    }
}
