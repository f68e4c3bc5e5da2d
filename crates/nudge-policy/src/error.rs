use thiserror::Error;

/// Errors that can occur within the policy subsystem.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The drip configuration is internally inconsistent.
    #[error("Invalid drip policy: {0}")]
    InvalidPolicy(String),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
