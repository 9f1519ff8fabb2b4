//! Reference table loading
//!
//! Nine catalog listings are fetched concurrently and reduced into
//! id -> attribute maps used to resolve foreign keys on host records. The
//! join barrier drains every task before the first error (if any) fails
//! the run: all tables finish or the whole build fails.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};
use url::Url;

use rackmap_catalog::{CachePolicy, CatalogFetch, page};

use crate::error::{InventoryError, Result};

/// Frozen id -> attribute projections of the catalog reference tables
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    /// site id -> slug
    pub sites: HashMap<u64, String>,
    /// site id -> region id, for sites that belong to a region
    pub site_regions: HashMap<u64, u64>,
    /// region id -> slug
    pub regions: HashMap<u64, String>,
    /// region id -> parent region id, for non-root regions
    pub region_parents: HashMap<u64, u64>,
    /// tenant id -> slug
    pub tenants: HashMap<u64, String>,
    /// rack id -> display name (racks carry no slug)
    pub racks: HashMap<u64, String>,
    /// device role id -> slug
    pub device_roles: HashMap<u64, String>,
    /// platform id -> slug
    pub platforms: HashMap<u64, String>,
    /// device type id -> slug
    pub device_types: HashMap<u64, String>,
    /// manufacturer id -> slug
    pub manufacturers: HashMap<u64, String>,
    /// cluster id -> cluster type slug
    pub cluster_types: HashMap<u64, String>,
    /// cluster id -> cluster group slug, for grouped clusters
    pub cluster_groups: HashMap<u64, String>,
}

/// The nine reference tables, in fetch-dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Sites,
    Regions,
    Tenants,
    Racks,
    DeviceRoles,
    Platforms,
    DeviceTypes,
    Manufacturers,
    Clusters,
}

impl Table {
    const ALL: [Table; 9] = [
        Table::Sites,
        Table::Regions,
        Table::Tenants,
        Table::Racks,
        Table::DeviceRoles,
        Table::Platforms,
        Table::DeviceTypes,
        Table::Manufacturers,
        Table::Clusters,
    ];

    fn list_path(self) -> &'static str {
        match self {
            Table::Sites => "dcim/sites/",
            Table::Regions => "dcim/regions/",
            Table::Tenants => "tenancy/tenants/",
            Table::Racks => "dcim/racks/",
            Table::DeviceRoles => "dcim/device-roles/",
            Table::Platforms => "dcim/platforms/",
            Table::DeviceTypes => "dcim/device-types/",
            Table::Manufacturers => "dcim/manufacturers/",
            Table::Clusters => "virtualization/clusters/",
        }
    }
}

/// Load all nine reference tables concurrently.
///
/// # Errors
/// Returns the first fetch error after every loader task has finished; a
/// single failed table fails the whole load.
#[instrument(skip(fetch, base))]
pub async fn load(
    fetch: Arc<dyn CatalogFetch>,
    base: &Url,
    policy: CachePolicy,
) -> Result<LookupTables> {
    let mut set = JoinSet::new();

    for table in Table::ALL {
        let mut url = base.join(table.list_path())?;
        url.query_pairs_mut().append_pair("limit", "0");
        let fetch = fetch.clone();
        set.spawn(async move {
            let records = page::fetch_all(fetch.as_ref(), url.as_str(), policy).await;
            (table, records)
        });
    }

    let mut tables = LookupTables::default();
    let mut first_err: Option<InventoryError> = None;

    // Drain every task before reporting failure: the barrier holds even
    // when one loader errors early.
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((table, Ok(records))) => {
                debug!(?table, records = records.len(), "reference table loaded");
                reduce(table, &records, &mut tables);
            }
            Ok((table, Err(e))) => {
                if first_err.is_none() {
                    first_err = Some(InventoryError::Catalog(e));
                } else {
                    debug!(?table, error = %e, "additional reference table failure");
                }
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(InventoryError::Task(e.to_string()));
                }
            }
        }
    }

    if let Some(e) = first_err {
        return Err(e);
    }

    info!(
        sites = tables.sites.len(),
        regions = tables.regions.len(),
        tenants = tables.tenants.len(),
        racks = tables.racks.len(),
        "lookup tables loaded"
    );

    Ok(tables)
}

fn reduce(table: Table, records: &[Value], tables: &mut LookupTables) {
    match table {
        Table::Sites => reduce_sites(records, tables),
        Table::Regions => reduce_regions(records, tables),
        Table::Tenants => reduce_slugs(records, &mut tables.tenants),
        Table::Racks => reduce_racks(records, tables),
        Table::DeviceRoles => reduce_slugs(records, &mut tables.device_roles),
        Table::Platforms => reduce_slugs(records, &mut tables.platforms),
        Table::DeviceTypes => reduce_slugs(records, &mut tables.device_types),
        Table::Manufacturers => reduce_slugs(records, &mut tables.manufacturers),
        Table::Clusters => reduce_clusters(records, tables),
    }
}

fn record_id(record: &Value) -> Option<u64> {
    record.get("id").and_then(Value::as_u64)
}

fn str_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// `{id: slug}` reduction shared by the flat tables
fn reduce_slugs(records: &[Value], out: &mut HashMap<u64, String>) {
    for record in records {
        if let Some(id) = record_id(record)
            && let Some(slug) = str_field(record, "slug")
        {
            out.insert(id, slug.to_string());
        }
    }
}

fn reduce_sites(records: &[Value], tables: &mut LookupTables) {
    for record in records {
        let Some(id) = record_id(record) else { continue };
        if let Some(slug) = str_field(record, "slug") {
            tables.sites.insert(id, slug.to_string());
        }
        if let Some(region_id) = record.get("region").and_then(record_id) {
            tables.site_regions.insert(id, region_id);
        }
    }
}

fn reduce_regions(records: &[Value], tables: &mut LookupTables) {
    for record in records {
        let Some(id) = record_id(record) else { continue };
        if let Some(slug) = str_field(record, "slug") {
            tables.regions.insert(id, slug.to_string());
        }
        if let Some(parent_id) = record.get("parent").and_then(record_id) {
            tables.region_parents.insert(id, parent_id);
        }
    }
}

fn reduce_racks(records: &[Value], tables: &mut LookupTables) {
    for record in records {
        if let Some(id) = record_id(record)
            && let Some(name) = str_field(record, "name")
        {
            tables.racks.insert(id, name.to_string());
        }
    }
}

fn reduce_clusters(records: &[Value], tables: &mut LookupTables) {
    for record in records {
        let Some(id) = record_id(record) else { continue };
        // type is required by the catalog schema but treated as optional
        if let Some(type_slug) = record.get("type").and_then(|t| str_field(t, "slug")) {
            tables.cluster_types.insert(id, type_slug.to_string());
        }
        if let Some(group_slug) = record.get("group").and_then(|g| str_field(g, "slug")) {
            tables.cluster_groups.insert(id, group_slug.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reduce_sites_builds_both_tables() {
        let records = vec![
            json!({"id": 10, "slug": "den01", "region": {"id": 3, "slug": "us-west"}}),
            json!({"id": 11, "slug": "fra02", "region": null}),
            json!({"id": 12, "slug": "ams01"}),
        ];
        let mut tables = LookupTables::default();
        reduce_sites(&records, &mut tables);

        assert_eq!(tables.sites.len(), 3);
        assert_eq!(tables.sites[&10], "den01");
        assert_eq!(tables.site_regions.len(), 1);
        assert_eq!(tables.site_regions[&10], 3);
    }

    #[test]
    fn test_reduce_regions_builds_parent_table() {
        let records = vec![
            json!({"id": 1, "slug": "emea", "parent": null}),
            json!({"id": 2, "slug": "emea-north", "parent": {"id": 1, "slug": "emea"}}),
        ];
        let mut tables = LookupTables::default();
        reduce_regions(&records, &mut tables);

        assert_eq!(tables.regions.len(), 2);
        assert_eq!(tables.region_parents.len(), 1);
        assert_eq!(tables.region_parents[&2], 1);
    }

    #[test]
    fn test_reduce_racks_uses_display_name() {
        let records = vec![json!({"id": 7, "name": "Rack 12"})];
        let mut tables = LookupTables::default();
        reduce_racks(&records, &mut tables);

        assert_eq!(tables.racks[&7], "Rack 12");
    }

    #[test]
    fn test_reduce_clusters_splits_type_and_group() {
        let records = vec![
            json!({"id": 4, "type": {"slug": "proxmox"}, "group": {"slug": "lab"}}),
            json!({"id": 5, "type": {"slug": "vmware"}, "group": null}),
            json!({"id": 6}),
        ];
        let mut tables = LookupTables::default();
        reduce_clusters(&records, &mut tables);

        assert_eq!(tables.cluster_types.len(), 2);
        assert_eq!(tables.cluster_types[&4], "proxmox");
        assert_eq!(tables.cluster_groups.len(), 1);
        assert_eq!(tables.cluster_groups[&4], "lab");
    }

    #[test]
    fn test_records_without_id_or_slug_are_skipped() {
        let records = vec![json!({"slug": "no-id"}), json!({"id": 9})];
        let mut out = HashMap::new();
        reduce_slugs(&records, &mut out);

        assert!(out.is_empty());
    }
}
