//! Error types for pg-diff operations.

use thiserror::Error;

/// Extract the full error message from a tokio_postgres::Error,
/// including the underlying DbError details that Display hides.
pub fn format_db_error(e: &tokio_postgres::Error) -> String {
    if let Some(db_err) = e.as_db_error() {
        let mut msg = db_err.message().to_string();
        if let Some(detail) = db_err.detail() {
            msg.push_str(&format!("\n  Detail: {}", detail));
        }
        if let Some(hint) = db_err.hint() {
            msg.push_str(&format!("\n  Hint: {}", hint));
        }
        return msg;
    }
    // Fallback: walk the source chain
    let mut msg = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        msg.push_str(&format!(": {}", s));
        source = s.source();
    }
    if e.is_closed() {
        msg.push_str("\n  Note: The database connection was closed unexpectedly.");
    }
    msg
}

/// All error types that pg-diff operations can produce.
///
/// Every variant is terminal for the invocation: a comparison either
/// completes on both sides or produces no diff at all.
#[derive(Error, Debug)]
pub enum PgDiffError {
    /// Invalid or missing configuration (TOML parse errors, missing source, etc.).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller input rejected before any connection was attempted.
    #[error("Validation error: {0}")]
    ValidationFailed(String),

    /// A connection to one of the databases could not be established.
    #[error("Unable to connect to the database {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// A database operation failed outside of a named extraction phase.
    #[error("Database error: {}", format_db_error(.0))]
    DatabaseError(#[from] tokio_postgres::Error),

    /// A statement failed while extracting a category.
    #[error("Query failed during {phase}: {reason}")]
    QueryFailed { phase: String, reason: String },

    /// The external describe-table command failed or returned unusable output.
    #[error("Describe failed for table {table}: {reason}")]
    DescribeFailed { table: String, reason: String },

    /// One side of a comparison failed; the other side's result was discarded.
    #[error("Loading {side} failed: {source}")]
    LoadFailed {
        side: String,
        #[source]
        source: Box<PgDiffError>,
    },

    /// Differences were found and the caller asked for that to be an error.
    #[error("Found {count} difference(s) in {category}")]
    DifferencesFound { category: String, count: usize },

    /// A filesystem I/O operation failed (reading the config file, etc.).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PgDiffError {
    /// Build a `QueryFailed` from a driver error, keeping the server detail.
    pub fn query(phase: impl Into<String>, e: &tokio_postgres::Error) -> Self {
        PgDiffError::QueryFailed {
            phase: phase.into(),
            reason: format_db_error(e),
        }
    }

    /// The innermost error, looking through `LoadFailed` wrappers.
    pub fn root(&self) -> &PgDiffError {
        match self {
            PgDiffError::LoadFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience type alias for `Result<T, PgDiffError>`.
pub type Result<T> = std::result::Result<T, PgDiffError>;
