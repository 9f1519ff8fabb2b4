//! Query filter validation and host listing URLs
//!
//! User-supplied filter predicates are single-key maps checked against a
//! per-resource allow-list before they are serialized into query
//! parameters. Rejected predicates are warned about and dropped, never
//! fatal. Repeated keys are preserved; the catalog treats them as OR.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::config::InventoryConfig;
use crate::error::Result;

/// One user-supplied filter predicate; valid predicates have exactly one key
pub type Predicate = BTreeMap<String, Value>;

/// Keys accepted when filtering the device listing
pub const DEVICE_QUERY_PARAMS: &[&str] = &[
    "asset_tag",
    "cluster_id",
    "device_type_id",
    "has_primary_ip",
    "id",
    "is_full_depth",
    "mac_address",
    "manufacturer",
    "model",
    "name",
    "platform",
    "position",
    "rack",
    "rack_id",
    "region",
    "role",
    "serial",
    "site",
    "site_id",
    "status",
    "tag",
    "tenant",
    "virtual_chassis_id",
];

/// Keys accepted when filtering the virtual machine listing
pub const VM_QUERY_PARAMS: &[&str] = &[
    "cluster",
    "cluster_group",
    "cluster_id",
    "cluster_type",
    "disk",
    "has_primary_ip",
    "id",
    "mac_address",
    "memory",
    "name",
    "platform",
    "region",
    "role",
    "site",
    "status",
    "tag",
    "tenant",
    "vcpus",
];

/// Prefix marking a custom-field filter; bypasses the allow-list
pub const CUSTOM_FIELD_PREFIX: &str = "cf_";

/// Which host resource class a listing URL targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Device,
    VirtualMachine,
}

impl HostKind {
    /// Listing path under the API base
    #[must_use]
    pub fn list_path(self) -> &'static str {
        match self {
            HostKind::Device => "dcim/devices/",
            HostKind::VirtualMachine => "virtualization/virtual-machines/",
        }
    }

    fn allowed_params(self) -> &'static [&'static str] {
        match self {
            HostKind::Device => DEVICE_QUERY_PARAMS,
            HostKind::VirtualMachine => VM_QUERY_PARAMS,
        }
    }
}

/// Validate one predicate against an allow-list.
///
/// Returns the accepted `(key, value)` pair, or `None` after warning when
/// the predicate is not a single-key map, the key is neither allowed nor
/// custom-field prefixed, or the value has no query-string rendering.
pub fn validate(predicate: &Predicate, allowed: &[&str]) -> Option<(String, String)> {
    if predicate.len() != 1 {
        warn!(?predicate, "ignoring query filter: not a single-key mapping");
        return None;
    }
    let (key, value) = predicate.iter().next()?;

    if !allowed.contains(&key.as_str()) && !key.starts_with(CUSTOM_FIELD_PREFIX) {
        warn!(key, "ignoring query filter: not an allowed parameter");
        return None;
    }

    let rendered = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => {
            warn!(key, ?value, "ignoring query filter: unsupported value type");
            return None;
        }
    };

    Some((key.clone(), rendered))
}

/// Validate a predicate list, preserving caller order and duplicate keys
#[must_use]
pub fn query_params(predicates: &[Predicate], allowed: &[&str]) -> Vec<(String, String)> {
    predicates
        .iter()
        .filter_map(|p| validate(p, allowed))
        .collect()
}

/// Build the host listing URLs to fetch for this run.
///
/// A resource class is skipped entirely when global `query_filters` are
/// supplied but none of them validates for that class: the user clearly
/// intended to filter, so an unfiltered full listing must not be returned.
///
/// # Errors
/// Returns an error if the configured endpoint is not a valid URL.
pub fn host_list_urls(config: &InventoryConfig) -> Result<Vec<(HostKind, Url)>> {
    let base = config.endpoint_url()?;
    let mut urls = Vec::new();

    for kind in [HostKind::Device, HostKind::VirtualMachine] {
        let allowed = kind.allowed_params();
        let global = query_params(&config.query_filters, allowed);

        if !config.query_filters.is_empty() && global.is_empty() {
            warn!(?kind, "no query filter validates for this resource class, skipping it");
            continue;
        }

        let specific = match kind {
            HostKind::Device => query_params(&config.device_query_filters, allowed),
            HostKind::VirtualMachine => query_params(&config.vm_query_filters, allowed),
        };

        let mut url = base.join(kind.list_path())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", "0");
            if !config.config_context {
                query.append_pair("exclude", "config_context");
            }
            for (key, value) in specific.iter().chain(global.iter()) {
                query.append_pair(key, value);
            }
        }
        urls.push((kind, url));
    }

    Ok(urls)
}
