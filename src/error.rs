use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageLensError {
    /// The gateway answered 2xx with a well-formed envelope whose status flag
    /// was falsy. The message is whatever the envelope carried, possibly empty.
    #[error("request rejected: {message}")]
    Rejected { message: String },
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UsageLensError>;
