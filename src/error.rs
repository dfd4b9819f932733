// src/error.rs

//! Unified error handling for the course crawler.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The catalogue could not be reached or answered with something unusable
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// The catalogue reports the department or course as absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// A cache file exists but cannot be read back
    #[error("Unreadable cache entry {path}: {message}")]
    CacheRead { path: String, message: String },

    /// No adapter is registered under the requested id
    #[error("Unknown adapter: {0}")]
    AdapterNotFound(String),

    /// The task pool cannot be built with the requested capacity
    #[error("Pool configuration error: {0}")]
    PoolConfiguration(String),

    /// A pooled unit panicked
    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound(context.into())
    }

    /// Create a cache read error for the given file.
    pub fn cache_read(path: &Path, message: impl fmt::Display) -> Self {
        Self::CacheRead {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the source explicitly reported the item as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
