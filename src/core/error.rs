//! Error types for the SiteRM console

use thiserror::Error;

/// Result type alias using the console's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Console error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Login failed: {message}")]
    LoginFailed { message: String },

    #[error("Not authenticated. Please run 'siterm-console login'.")]
    Unauthorized,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Token storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl Error {
    /// Message suitable for an operator-facing banner or form error
    pub fn user_message(&self) -> String {
        match self {
            Error::LoginFailed { message } => message.clone(),
            Error::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status behind this error, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized => Some(401),
            Error::Server { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
