//! Error types for the catalog transport layer

use thiserror::Error;

/// Errors that can occur when talking to the catalog service
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Catalog returned an error status
    #[error("catalog error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the catalog
        message: String,
    },

    /// Response body was not valid JSON or did not have the expected shape
    #[error("invalid catalog response: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A fetch was attempted with an empty URL
    #[error("refusing to fetch an empty URL")]
    EmptyUrl,

    /// Client options that cannot produce a working client
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
