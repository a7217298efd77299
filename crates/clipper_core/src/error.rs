use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No catalog for channel: {0}")]
    NotFound(String),

    #[error("Malformed catalog: {0}")]
    Malformed(String),

    #[error("Index {index} out of range (catalog has {len} clips)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Player error: {0}")]
    Player(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
