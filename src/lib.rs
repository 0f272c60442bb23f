pub mod browser;
pub mod config;
pub mod detection;
pub mod discovery;
pub mod extraction;
pub mod models;
pub mod pipeline;
pub mod plugins;
pub mod retry;
pub mod store;
pub mod summary;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use pipeline::{Pipeline, RunReport};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
