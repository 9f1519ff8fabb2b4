//! Error types for the inventory assembler

use thiserror::Error;

use rackmap_catalog::CatalogError;

/// Errors that can occur while building an inventory
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Catalog transport or decode failure; fatal for the whole run
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Invalid configuration; the message names the offending option
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A lookup loader task died without reporting a result
    #[error("lookup task failed: {0}")]
    Task(String),
}

impl From<url::ParseError> for InventoryError {
    fn from(e: url::ParseError) -> Self {
        InventoryError::Catalog(CatalogError::Url(e))
    }
}

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

