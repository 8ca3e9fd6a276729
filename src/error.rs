// src/error.rs

//! Unified error handling for the page cache.

use std::fmt;

use thiserror::Error;

/// Result type alias for page cache operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// AWS S3 error
    #[error("S3 error: {0}")]
    S3(String),

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

    /// Content API answered with a non-success status
    #[error("Notion API error ({status}) on {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The requested page has no blocks
    #[error("Notion page not found \"{0}\"")]
    PageNotFound(String),

    /// Page ID could not be parsed into a Notion UUID
    #[error("Invalid Notion page ID: {0}")]
    InvalidPageId(String),

    /// Cache store failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Preview image decoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a content API error for an endpoint.
    pub fn api(endpoint: impl Into<String>, status: u16, message: impl fmt::Display) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a cache store error.
    pub fn cache(message: impl fmt::Display) -> Self {
        Self::Cache(message.to_string())
    }

    /// Create an S3 error.
    pub fn s3(message: impl fmt::Display) -> Self {
        Self::S3(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
