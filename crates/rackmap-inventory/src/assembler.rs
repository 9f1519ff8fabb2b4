//! Inventory assembly orchestration
//!
//! One linear run: load the lookup tables, fetch devices and virtual
//! machines, extract groups and variables per host, then build the region
//! forest when region grouping was requested. Any transport, decode or
//! configuration error aborts the whole run; there are no retries and no
//! partial inventories.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use rackmap_catalog::{CachePolicy, CatalogClient, CatalogFetch, ClientOptions, page};

use crate::config::InventoryConfig;
use crate::error::{InventoryError, Result};
use crate::extract::{self, Entry, ExtractorOptions, ExtractorRegistry};
use crate::filter::{self, HostKind};
use crate::inventory::Inventory;
use crate::lookup::{self, LookupTables};
use crate::regions::RegionTreeBuilder;

/// Group name transformation supplied by the consuming engine
pub type NameFn = dyn Fn(&str) -> String + Send + Sync;

/// Builds one inventory from the catalog
pub struct InventoryAssembler {
    config: InventoryConfig,
    fetch: Arc<dyn CatalogFetch>,
    registry: ExtractorRegistry,
    name_fn: Box<NameFn>,
}

impl InventoryAssembler {
    /// Create an assembler with an HTTP-backed catalog client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built from the
    /// configured token, timeout and TLS settings.
    pub fn new(config: InventoryConfig) -> Result<Self> {
        let client = CatalogClient::new(&ClientOptions {
            token: config.token.clone(),
            timeout: config.timeout(),
            validate_certs: config.validate_certs,
            cache_ttl: config.cache_ttl(),
        })?;
        Ok(Self::with_fetcher(config, Arc::new(client)))
    }

    /// Create an assembler over any catalog transport
    #[must_use]
    pub fn with_fetcher(config: InventoryConfig, fetch: Arc<dyn CatalogFetch>) -> Self {
        let registry = ExtractorRegistry::new(ExtractorOptions {
            plurals: config.plurals,
            flatten_config_context: config.flatten_config_context,
            flatten_custom_fields: config.flatten_custom_fields,
        });
        Self {
            config,
            fetch,
            registry,
            name_fn: Box::new(|name: &str| name.to_string()),
        }
    }

    /// Replace the group name transformation
    #[must_use]
    pub fn with_name_fn(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.name_fn = Box::new(f);
        self
    }

    /// Build the inventory
    ///
    /// # Errors
    /// Returns a configuration error for an unresolvable `group_by` key or
    /// a bad endpoint, and a catalog error when any fetch fails.
    #[instrument(skip(self))]
    pub async fn assemble(&self) -> Result<Inventory> {
        let (group_entries, want_regions) = self.resolve_group_by()?;
        let base = self.config.endpoint_url()?;
        let policy = if self.config.cache {
            CachePolicy::read_write()
        } else {
            CachePolicy::disabled()
        };

        info!("loading lookup tables");
        let tables = lookup::load(self.fetch.clone(), &base, policy).await?;

        info!("fetching hosts");
        let mut hosts = Vec::new();
        for (kind, url) in filter::host_list_urls(&self.config)? {
            let records = page::fetch_all(self.fetch.as_ref(), url.as_str(), policy).await?;
            info!(?kind, count = records.len(), "host listing fetched");
            hosts.extend(records.into_iter().map(|record| (kind, record)));
        }

        info!(hosts = hosts.len(), "extracting host variables");
        let mut inventory = Inventory::new();
        for (kind, record) in &hosts {
            self.add_host(&mut inventory, *kind, record, &tables, &group_entries, policy)
                .await?;
        }

        if want_regions {
            info!("building region groups");
            self.build_region_tree(&mut inventory, &tables);
        }

        info!(
            groups = inventory.groups.len(),
            hosts = inventory.hostvars.len(),
            "inventory assembled"
        );

        Ok(inventory)
    }

    /// Resolve `group_by` keys against the active extractor table.
    /// The region key switches on the region tree builder instead of
    /// producing per-host groups.
    fn resolve_group_by(&self) -> Result<(Vec<&'static Entry>, bool)> {
        let mut entries = Vec::new();
        let mut want_regions = false;
        for key in &self.config.group_by {
            if self.registry.is_region_key(key) {
                want_regions = true;
                continue;
            }
            let entry = self.registry.entry(key).ok_or_else(|| {
                InventoryError::Config(format!("unknown group_by key: {key}"))
            })?;
            entries.push(entry);
        }
        Ok((entries, want_regions))
    }

    async fn add_host(
        &self,
        inventory: &mut Inventory,
        kind: HostKind,
        record: &Value,
        tables: &LookupTables,
        group_entries: &[&'static Entry],
        policy: CachePolicy,
    ) -> Result<()> {
        let name = host_name(record);

        let mut vars = self.registry.host_variables(record, tables);
        if let Some(id) = record.get("id").filter(|v| !v.is_null()) {
            vars.insert("id".to_string(), id.clone());
        }
        for field in ["primary_ip4", "primary_ip6"] {
            if let Some(address) = extract::primary_ip(record, field) {
                vars.insert(field.to_string(), Value::String(address));
            }
        }

        if self.config.interfaces {
            self.attach_interfaces(kind, record, &mut vars, policy)
                .await?;
        }
        if self.config.services {
            self.attach_services(kind, &name, &mut vars, policy).await?;
        }

        for entry in group_entries {
            let Some(value) = self.registry.extract(entry, record, tables) else {
                continue;
            };
            for group_value in group_values(&value) {
                let group_name = if self.config.group_names_raw {
                    (self.name_fn)(&group_value)
                } else {
                    (self.name_fn)(&format!("{}_{}", entry.group_key, group_value))
                };
                inventory.add_host(&group_name, &name);
            }
        }

        inventory.hostvars.insert(name, vars);
        Ok(())
    }

    /// Fetch interfaces for one host and join its IP addresses onto them
    /// in memory by interface id. One extra fetch pair per host.
    async fn attach_interfaces(
        &self,
        kind: HostKind,
        record: &Value,
        vars: &mut serde_json::Map<String, Value>,
        policy: CachePolicy,
    ) -> Result<()> {
        let Some(id) = record.get("id").and_then(Value::as_u64) else {
            return Ok(());
        };
        let base = self.config.endpoint_url()?;

        let (interface_path, host_param) = match kind {
            HostKind::Device => ("dcim/interfaces/", "device_id"),
            HostKind::VirtualMachine => ("virtualization/interfaces/", "virtual_machine_id"),
        };

        let mut url = base.join(interface_path)?;
        url.query_pairs_mut()
            .append_pair("limit", "0")
            .append_pair(host_param, &id.to_string());
        let mut interfaces = page::fetch_all(self.fetch.as_ref(), url.as_str(), policy).await?;

        let mut url = base.join("ipam/ip-addresses/")?;
        url.query_pairs_mut()
            .append_pair("limit", "0")
            .append_pair(host_param, &id.to_string());
        let addresses = page::fetch_all(self.fetch.as_ref(), url.as_str(), policy).await?;

        for interface in &mut interfaces {
            let interface_id = interface.get("id").and_then(Value::as_u64);
            let matched: Vec<Value> = addresses
                .iter()
                .filter(|addr| {
                    addr.get("interface")
                        .and_then(|i| i.get("id"))
                        .and_then(Value::as_u64)
                        == interface_id
                })
                .cloned()
                .collect();
            if let Some(object) = interface.as_object_mut() {
                object.insert("ip_addresses".to_string(), Value::Array(matched));
            }
        }

        vars.insert("interfaces".to_string(), Value::Array(interfaces));
        Ok(())
    }

    /// One additional fetch per host, filtered by host name. Not batched;
    /// known N+1 inefficiency carried over from the observed behavior.
    async fn attach_services(
        &self,
        kind: HostKind,
        name: &str,
        vars: &mut serde_json::Map<String, Value>,
        policy: CachePolicy,
    ) -> Result<()> {
        let base = self.config.endpoint_url()?;
        let host_param = match kind {
            HostKind::Device => "device",
            HostKind::VirtualMachine => "virtual_machine",
        };

        let mut url = base.join("ipam/services/")?;
        url.query_pairs_mut()
            .append_pair("limit", "0")
            .append_pair(host_param, name);
        let services = page::fetch_all(self.fetch.as_ref(), url.as_str(), policy).await?;

        vars.insert("services".to_string(), Value::Array(services));
        Ok(())
    }

    fn build_region_tree(&self, inventory: &mut Inventory, tables: &LookupTables) {
        let (region_prefix, site_prefix) = if self.config.group_names_raw {
            (None, None)
        } else {
            let region_key = if self.config.plurals { "regions" } else { "region" };
            let site_key = if self.config.plurals { "sites" } else { "site" };
            (Some(region_key), Some(site_key))
        };
        RegionTreeBuilder::new(tables, region_prefix, site_prefix, &*self.name_fn)
            .build(inventory);
    }
}

/// Inventory hostname: the record name, or a generated unique identifier
/// when the catalog record has none
fn host_name(record: &Value) -> String {
    match record.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Flatten an extracted value into group name components
fn group_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        _ => scalar_string(value).into_iter().collect(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_host_name_substitutes_generated_id() {
        let named = host_name(&json!({"name": "r1"}));
        assert_eq!(named, "r1");

        let anonymous = host_name(&json!({"name": ""}));
        assert_eq!(anonymous.len(), 36);

        let missing = host_name(&json!({}));
        assert_ne!(missing, anonymous);
    }

    #[test]
    fn test_group_values_flattens_wrapped_scalars() {
        assert_eq!(group_values(&json!("core")), vec!["core"]);
        assert_eq!(group_values(&json!(["core"])), vec!["core"]);
        assert_eq!(group_values(&json!(["a", "b"])), vec!["a", "b"]);
        assert_eq!(group_values(&json!(true)), vec!["true"]);
        assert!(group_values(&json!({"k": 1})).is_empty());
    }
}
