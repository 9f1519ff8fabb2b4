//! rackmap-catalog: HTTP transport for the network catalog service
//!
//! Provides the authenticated catalog client, the URL-keyed response cache
//! and the pagination helper used by the inventory assembler.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use rackmap_catalog::{CachePolicy, CatalogClient, CatalogFetch, ClientOptions, page};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CatalogClient::new(&ClientOptions {
//!     token: "0123456789abcdef".to_string(),
//!     timeout: Duration::from_secs(30),
//!     ..ClientOptions::default()
//! })?;
//!
//! // Single fetch
//! let sites = client
//!     .fetch("https://catalog.example.com/api/dcim/sites/?limit=0", CachePolicy::disabled())
//!     .await?;
//!
//! // Every page of a listing
//! let devices = page::fetch_all(
//!     &client,
//!     "https://catalog.example.com/api/dcim/devices/?limit=0",
//!     CachePolicy::read_write(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod http;
pub mod page;

pub use cache::{CachePolicy, ResponseCache};
pub use error::{CatalogError, Result};
pub use http::{CatalogClient, CatalogFetch, ClientOptions};
