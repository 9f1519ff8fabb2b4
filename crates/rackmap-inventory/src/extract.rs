//! Host variable and group extraction
//!
//! A fixed table maps each group/variable key to a pure function of the
//! host record and the lookup tables. Two tables exist, singular- and
//! plural-keyed; the active one is chosen once at registry construction.
//! Extraction never fails: catalog records legitimately omit optional
//! relations, so any miss is simply no value for this host.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::lookup::LookupTables;

/// A pure extraction function; `None` means no value for this host
pub type ExtractorFn = fn(&Value, &LookupTables) -> Option<Value>;

/// How an extracted value is shaped into a host variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scalar value, wrapped in a one-element array in plural mode
    Scalar,
    /// Already collection-shaped, never wrapped
    List,
    /// Config context object; flattened into sibling variables on request
    ConfigContext,
    /// Custom fields object; flattened into sibling variables on request
    CustomFields,
}

/// One registry entry
#[derive(Debug)]
pub struct Entry {
    /// Key used for `group_by` resolution and as the group name prefix
    pub group_key: &'static str,
    /// Host variable name; stays singular in both naming schemes
    pub var_name: &'static str,
    extract: ExtractorFn,
    pub mode: Mode,
}

static SINGULAR_EXTRACTORS: &[Entry] = &[
    Entry { group_key: "site", var_name: "site", extract: extract_site, mode: Mode::Scalar },
    Entry { group_key: "tenant", var_name: "tenant", extract: extract_tenant, mode: Mode::Scalar },
    Entry { group_key: "rack", var_name: "rack", extract: extract_rack, mode: Mode::Scalar },
    Entry { group_key: "tags", var_name: "tags", extract: extract_tags, mode: Mode::List },
    Entry { group_key: "device_role", var_name: "device_role", extract: extract_device_role, mode: Mode::Scalar },
    Entry { group_key: "platform", var_name: "platform", extract: extract_platform, mode: Mode::Scalar },
    Entry { group_key: "device_type", var_name: "device_type", extract: extract_device_type, mode: Mode::Scalar },
    Entry { group_key: "manufacturer", var_name: "manufacturer", extract: extract_manufacturer, mode: Mode::Scalar },
    Entry { group_key: "cluster", var_name: "cluster", extract: extract_cluster, mode: Mode::Scalar },
    Entry { group_key: "cluster_type", var_name: "cluster_type", extract: extract_cluster_type, mode: Mode::Scalar },
    Entry { group_key: "cluster_group", var_name: "cluster_group", extract: extract_cluster_group, mode: Mode::Scalar },
    Entry { group_key: "region", var_name: "regions", extract: extract_regions, mode: Mode::List },
    Entry { group_key: "status", var_name: "status", extract: extract_status, mode: Mode::Scalar },
    Entry { group_key: "memory", var_name: "memory", extract: extract_memory, mode: Mode::Scalar },
    Entry { group_key: "disk", var_name: "disk", extract: extract_disk, mode: Mode::Scalar },
    Entry { group_key: "vcpus", var_name: "vcpus", extract: extract_vcpus, mode: Mode::Scalar },
    Entry { group_key: "is_virtual", var_name: "is_virtual", extract: extract_is_virtual, mode: Mode::Scalar },
    Entry { group_key: "config_context", var_name: "config_context", extract: extract_config_context, mode: Mode::ConfigContext },
    Entry { group_key: "custom_fields", var_name: "custom_fields", extract: extract_custom_fields, mode: Mode::CustomFields },
];

static PLURAL_EXTRACTORS: &[Entry] = &[
    Entry { group_key: "sites", var_name: "site", extract: extract_site, mode: Mode::Scalar },
    Entry { group_key: "tenants", var_name: "tenant", extract: extract_tenant, mode: Mode::Scalar },
    Entry { group_key: "racks", var_name: "rack", extract: extract_rack, mode: Mode::Scalar },
    Entry { group_key: "tags", var_name: "tags", extract: extract_tags, mode: Mode::List },
    Entry { group_key: "device_roles", var_name: "device_role", extract: extract_device_role, mode: Mode::Scalar },
    Entry { group_key: "platforms", var_name: "platform", extract: extract_platform, mode: Mode::Scalar },
    Entry { group_key: "device_types", var_name: "device_type", extract: extract_device_type, mode: Mode::Scalar },
    Entry { group_key: "manufacturers", var_name: "manufacturer", extract: extract_manufacturer, mode: Mode::Scalar },
    Entry { group_key: "cluster", var_name: "cluster", extract: extract_cluster, mode: Mode::Scalar },
    Entry { group_key: "cluster_type", var_name: "cluster_type", extract: extract_cluster_type, mode: Mode::Scalar },
    Entry { group_key: "cluster_group", var_name: "cluster_group", extract: extract_cluster_group, mode: Mode::Scalar },
    Entry { group_key: "regions", var_name: "regions", extract: extract_regions, mode: Mode::List },
    Entry { group_key: "status", var_name: "status", extract: extract_status, mode: Mode::Scalar },
    Entry { group_key: "memory", var_name: "memory", extract: extract_memory, mode: Mode::Scalar },
    Entry { group_key: "disk", var_name: "disk", extract: extract_disk, mode: Mode::Scalar },
    Entry { group_key: "vcpus", var_name: "vcpus", extract: extract_vcpus, mode: Mode::Scalar },
    Entry { group_key: "is_virtual", var_name: "is_virtual", extract: extract_is_virtual, mode: Mode::Scalar },
    Entry { group_key: "config_context", var_name: "config_context", extract: extract_config_context, mode: Mode::ConfigContext },
    Entry { group_key: "custom_fields", var_name: "custom_fields", extract: extract_custom_fields, mode: Mode::CustomFields },
];

/// Naming and flattening behavior for a registry
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractorOptions {
    pub plurals: bool,
    pub flatten_config_context: bool,
    pub flatten_custom_fields: bool,
}

/// The active extractor table for one assembler run
#[derive(Debug)]
pub struct ExtractorRegistry {
    entries: &'static [Entry],
    options: ExtractorOptions,
}

impl ExtractorRegistry {
    /// Select the singular or plural table
    #[must_use]
    pub fn new(options: ExtractorOptions) -> Self {
        let entries = if options.plurals {
            PLURAL_EXTRACTORS
        } else {
            SINGULAR_EXTRACTORS
        };
        Self { entries, options }
    }

    /// Look up an entry by its group key
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&'static Entry> {
        let entries: &'static [Entry] = self.entries;
        entries.iter().find(|e| e.group_key == key)
    }

    /// Whether `key` names the region extractor; region grouping is
    /// handled by the region tree builder, not per-host groups
    #[must_use]
    pub fn is_region_key(&self, key: &str) -> bool {
        self.entry(key).is_some_and(|e| e.var_name == "regions")
    }

    /// Run one extractor and apply the wrapping rule
    #[must_use]
    pub fn extract(&self, entry: &Entry, host: &Value, tables: &LookupTables) -> Option<Value> {
        let value = (entry.extract)(host, tables)?;
        let wrap = match entry.mode {
            Mode::List => false,
            Mode::Scalar => self.options.plurals,
            Mode::ConfigContext => self.options.plurals && !self.options.flatten_config_context,
            Mode::CustomFields => self.options.plurals && !self.options.flatten_custom_fields,
        };
        Some(if wrap {
            Value::Array(vec![value])
        } else {
            value
        })
    }

    /// Run every extractor against one host record
    #[must_use]
    pub fn host_variables(&self, host: &Value, tables: &LookupTables) -> Map<String, Value> {
        let mut vars = Map::new();
        for entry in self.entries {
            let Some(value) = self.extract(entry, host, tables) else {
                continue;
            };
            let flatten = match entry.mode {
                Mode::ConfigContext => self.options.flatten_config_context,
                Mode::CustomFields => self.options.flatten_custom_fields,
                _ => false,
            };
            if flatten {
                if let Value::Object(map) = value {
                    vars.extend(map);
                }
            } else {
                vars.insert(entry.var_name.to_string(), value);
            }
        }
        vars
    }
}

fn related_id(host: &Value, field: &str) -> Option<u64> {
    host.get(field)?.get("id")?.as_u64()
}

fn slug_value(slug: &str) -> Value {
    Value::String(slug.to_string())
}

fn extract_site(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "site")?;
    tables.sites.get(&id).map(|s| slug_value(s))
}

fn extract_tenant(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "tenant")?;
    tables.tenants.get(&id).map(|s| slug_value(s))
}

fn extract_rack(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "rack")?;
    tables.racks.get(&id).map(|s| slug_value(s))
}

/// Tag lists arrive either as plain strings or as objects carrying a slug
fn extract_tags(host: &Value, _tables: &LookupTables) -> Option<Value> {
    let tags = host.get("tags")?.as_array()?;
    let slugs = tags
        .iter()
        .map(|tag| tag.get("slug").cloned().unwrap_or_else(|| tag.clone()))
        .collect();
    Some(Value::Array(slugs))
}

/// The same concept is `device_role` on devices and `role` on VMs
fn extract_device_role(host: &Value, tables: &LookupTables) -> Option<Value> {
    let role = host.get("device_role").or_else(|| host.get("role"))?;
    let id = role.get("id")?.as_u64()?;
    tables.device_roles.get(&id).map(|s| slug_value(s))
}

fn extract_platform(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "platform")?;
    tables.platforms.get(&id).map(|s| slug_value(s))
}

fn extract_device_type(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "device_type")?;
    tables.device_types.get(&id).map(|s| slug_value(s))
}

fn extract_manufacturer(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = host
        .get("device_type")?
        .get("manufacturer")?
        .get("id")?
        .as_u64()?;
    tables.manufacturers.get(&id).map(|s| slug_value(s))
}

fn extract_cluster(host: &Value, _tables: &LookupTables) -> Option<Value> {
    let name = host.get("cluster")?.get("name")?.as_str()?;
    Some(Value::String(name.to_string()))
}

fn extract_cluster_type(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "cluster")?;
    tables.cluster_types.get(&id).map(|s| slug_value(s))
}

fn extract_cluster_group(host: &Value, tables: &LookupTables) -> Option<Value> {
    let id = related_id(host, "cluster")?;
    tables.cluster_groups.get(&id).map(|s| slug_value(s))
}

/// Region ancestry, nearest first. Bounded walk with a visited set: a
/// parent cycle in the catalog data terminates the chain instead of
/// hanging.
fn extract_regions(host: &Value, tables: &LookupTables) -> Option<Value> {
    let site_id = related_id(host, "site")?;
    let mut region_id = *tables.site_regions.get(&site_id)?;
    let mut chain = Vec::new();
    let mut seen = HashSet::new();

    while seen.insert(region_id) {
        let Some(slug) = tables.regions.get(&region_id) else {
            break;
        };
        chain.push(slug_value(slug));
        match tables.region_parents.get(&region_id) {
            Some(parent) => region_id = *parent,
            None => break,
        }
    }

    if chain.is_empty() {
        None
    } else {
        Some(Value::Array(chain))
    }
}

fn extract_status(host: &Value, _tables: &LookupTables) -> Option<Value> {
    let status = host.get("status")?;
    match status {
        Value::String(_) => Some(status.clone()),
        _ => status.get("value").cloned(),
    }
}

fn extract_memory(host: &Value, _tables: &LookupTables) -> Option<Value> {
    host.get("memory").filter(|v| !v.is_null()).cloned()
}

fn extract_disk(host: &Value, _tables: &LookupTables) -> Option<Value> {
    host.get("disk").filter(|v| !v.is_null()).cloned()
}

fn extract_vcpus(host: &Value, _tables: &LookupTables) -> Option<Value> {
    host.get("vcpus").filter(|v| !v.is_null()).cloned()
}

/// Field presence distinguishes the two host schemas
fn extract_is_virtual(host: &Value, _tables: &LookupTables) -> Option<Value> {
    if host.get("device_role").is_some() {
        Some(Value::Bool(false))
    } else if host.get("role").is_some() {
        Some(Value::Bool(true))
    } else {
        None
    }
}

fn extract_config_context(host: &Value, _tables: &LookupTables) -> Option<Value> {
    host.get("config_context").filter(|v| !v.is_null()).cloned()
}

fn extract_custom_fields(host: &Value, _tables: &LookupTables) -> Option<Value> {
    host.get("custom_fields").filter(|v| !v.is_null()).cloned()
}

/// Primary address with the CIDR suffix stripped; emitted unwrapped in
/// both naming schemes
#[must_use]
pub fn primary_ip(host: &Value, field: &str) -> Option<String> {
    let address = host.get(field)?.get("address")?.as_str()?;
    address.split('/').next().map(str::to_string)
}
