use thiserror::Error;

/// Errors that can occur while reading the directory or activity ledger.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored timestamp could not be parsed as RFC 3339.
    ///
    /// Surfaces per row so the pipeline can skip the one bad candidate
    /// instead of aborting the whole run.
    #[error("Malformed timestamp in {table}.{column} for id {id}: {value}")]
    MalformedTimestamp {
        table: &'static str,
        column: &'static str,
        id: i64,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
