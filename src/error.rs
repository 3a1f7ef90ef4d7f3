use thiserror::Error;

/// Application-wide error type
///
/// Every failure is terminal for the attempt that produced it: callers log a
/// human-readable message on the activity bus and return the UI to its
/// pre-action state. No variant is fatal to the process.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Device query failed: {0}")]
    DeviceQuery(String),

    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(String),

    #[error("Room connect failed: {0}")]
    RoomConnect(String),

    #[error("Token fetch failed: {0}")]
    TokenFetch(String),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AppError>;
