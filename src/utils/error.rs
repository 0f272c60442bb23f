use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out waiting for selector: {selector}")]
    Timeout { selector: String },

    #[error("Access denied (status {status})")]
    AccessDenied { status: u16 },

    #[error("Discovery failed for {catalog_url}: {message}")]
    Discovery { catalog_url: String, message: String },

    #[error("Gave up on {item_url} after {attempts} attempts")]
    RetryExhausted { item_url: String, attempts: u32 },

    #[error("Notification error: {channel}: {message}")]
    Notification { channel: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Blocked fetches mean the session fingerprint was flagged.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, AppError::AccessDenied { .. })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
