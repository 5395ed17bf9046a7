//! Error types for ankit-notion.

use thiserror::Error;

/// Result type for ankit-notion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a deck build.
///
/// Conditions the converter tolerates (a dangling page link, a missing image,
/// an unrecognised video URL) are logged instead and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// SQLite error (apkg feature).
    #[cfg(feature = "apkg")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking package writer panicked or was cancelled.
    #[error("package writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The requested page is not part of the file set.
    #[error("page not found in file set: {0}")]
    PageNotFound(String),

    /// No workspace base directory was configured.
    #[error("undefined workspace: set WORKSPACE_BASE to a writable directory")]
    MissingWorkspace,

    /// A CSS selector failed to parse.
    #[error("invalid CSS selector: {0}")]
    InvalidSelector(String),

    /// A percent-encoded path did not decode to valid UTF-8.
    #[error("invalid encoded path: {0}")]
    InvalidPath(String),
}
