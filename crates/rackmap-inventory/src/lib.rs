//! rackmap-inventory: dynamic inventory assembly from a network catalog
//!
//! Projects the catalog's sites, racks, devices and virtual machines into
//! named groups (with a parent/child hierarchy) and per-host variables for
//! consumption by automation engines.
//!
//! # Example
//!
//! ```no_run
//! use rackmap_inventory::{InventoryAssembler, InventoryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InventoryConfig::load("rackmap.toml")?;
//! let assembler = InventoryAssembler::new(config)?;
//!
//! let inventory = assembler.assemble().await?;
//! println!("{}", inventory.to_json());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod inventory;
pub mod lookup;
pub mod regions;

pub use assembler::InventoryAssembler;
pub use config::InventoryConfig;
pub use error::{InventoryError, Result};
pub use extract::{ExtractorOptions, ExtractorRegistry};
pub use inventory::{Group, Inventory, sanitize_name};
pub use lookup::LookupTables;
