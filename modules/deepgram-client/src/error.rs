use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeepgramError>;

#[derive(Debug, Error)]
pub enum DeepgramError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response parsed but carried no usable transcript. This is a hard
    /// failure, never an empty-string success.
    #[error("no transcript in response")]
    NoTranscript,
}

impl From<reqwest::Error> for DeepgramError {
    fn from(err: reqwest::Error) -> Self {
        DeepgramError::Network(err.to_string())
    }
}
