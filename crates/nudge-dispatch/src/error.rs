use thiserror::Error;

/// Errors that can occur within the dispatch recorder.
///
/// Note the asymmetry with the rest of the taxonomy: "already sent" is not
/// an error here — [`crate::DispatchStore::reserve`] reports it as
/// `Ok(false)`. Only genuine persistence failures surface as `Err`, and the
/// pipeline treats those as "not reserved" (fail closed).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
