use thiserror::Error;

pub type Result<T> = std::result::Result<T, StripeError>;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for StripeError {
    fn from(err: reqwest::Error) -> Self {
        StripeError::Network(err.to_string())
    }
}
