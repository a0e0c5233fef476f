//! Error types for the bridge
//!
//! Everything in this enum is fatal to the operation that returned it.
//! Per-record decode failures are deliberately a separate type
//! ([`crate::protocol::RecordError`]) so that dropping one corrupt
//! record never aborts a session.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("Config error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// No line arrived before the per-read deadline
    #[error("Communication timeout")]
    Timeout,

    /// Structural protocol violation (START/END framing)
    ///
    /// The serial stream cannot be trusted past this point; the only
    /// recovery is a fresh session from the wake byte.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
