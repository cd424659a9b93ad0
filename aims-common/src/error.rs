//! Common error types for AIMS

use thiserror::Error;

/// Common result type for AIMS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the shared core
///
/// All variants are local and non-retryable: they describe malformed input
/// or an environment problem, never a transient condition.
#[derive(Error, Debug)]
pub enum Error {
    /// Audio buffer is empty, ragged, or contains non-finite samples
    #[error("Invalid audio shape: {0}")]
    InvalidAudioShape(String),

    /// Prompt or caption was empty (after trimming)
    #[error("Empty input: {0} is required")]
    EmptyInput(&'static str),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV encoding error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
