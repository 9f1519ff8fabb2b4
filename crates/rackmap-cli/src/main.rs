//! rackmap CLI
//!
//! Dynamic inventory entry point: builds the inventory from the catalog
//! and prints it as JSON on stdout. Logs go to stderr so the output stays
//! machine-readable.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use serde_json::{Value, json};
use tracing::info;

use rackmap_inventory::{InventoryAssembler, InventoryConfig};

#[derive(Parser)]
#[command(name = "rackmap")]
#[command(about = "Dynamic automation inventory from a network catalog", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short)]
    config: PathBuf,

    /// Print the full inventory
    #[arg(long)]
    list: bool,

    /// Print the variables of a single host
    #[arg(long, value_name = "NAME", conflicts_with = "list")]
    host: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = InventoryConfig::load(&cli.config)?;
    let assembler = InventoryAssembler::new(config)?;

    let inventory = assembler.assemble().await?;
    info!(
        groups = inventory.groups.len(),
        hosts = inventory.hostvars.len(),
        "inventory ready"
    );

    let output = match &cli.host {
        // The dynamic-inventory contract: unknown hosts get an empty object
        Some(host) => inventory
            .host_variables(host)
            .map(|vars| Value::Object(vars.clone()))
            .unwrap_or_else(|| json!({})),
        None => inventory.to_json(),
    };

    if cli.pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{output}");
    }

    Ok(())
}
