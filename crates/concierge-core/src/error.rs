use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConciergeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConciergeError>;
