use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No credentials found at {}", .0.display())]
    MissingCredentials(PathBuf),

    #[error("OAuth token exchange failed: {0}")]
    TokenRefresh(String),

    #[error("Google Sheets API error: {0}")]
    Remote(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
