use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuakefeedError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuakefeedError {
    /// True for failures where the source answered but the answer was unusable
    /// (bad status or a body that does not decode).
    pub fn is_protocol(&self) -> bool {
        match self {
            QuakefeedError::Status { .. } | QuakefeedError::Decode(_) => true,
            QuakefeedError::Http(e) => e.is_decode() || e.is_status(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuakefeedError>;
