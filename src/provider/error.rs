use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider login failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Provider returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Provider request timed out: {0}")]
    Timeout(String),

    #[error("Provider response could not be decoded: {0}")]
    Decode(String),

    #[error("Provider unreachable: {0}")]
    Transport(String),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ProviderError {
    fn from(err: url::ParseError) -> Self {
        ProviderError::InvalidUrl(err.to_string())
    }
}
