use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("GitHub rejected the credential ({status}): {body}")]
    InvalidCredentials { status: u16, body: String },

    #[error("Token exchange failed ({status}): {body}")]
    ExchangeFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Device flow timeout")]
    DeviceFlowTimeout,

    #[error("OAuth error: {0}")]
    OAuthError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::NetworkError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
