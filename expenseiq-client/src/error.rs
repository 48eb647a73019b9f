use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend rejected the bearer token; the local session has been cleared.
    #[error("session expired or not signed in")]
    Unauthorized,

    #[error("backend returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    /// `success: false` in an otherwise well-formed response
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid base URL {url}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
