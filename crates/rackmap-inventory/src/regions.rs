//! Region group forest
//!
//! Projects the regions lookup table into a forest of named groups: one
//! group per region, child regions nested under their parent's group, and
//! each region-bearing site's group nested under its region's group.

use std::collections::HashMap;

use tracing::debug;

use crate::inventory::Inventory;
use crate::lookup::LookupTables;

/// Builds the region group hierarchy into an [`Inventory`].
///
/// `region_prefix` / `site_prefix` are the `<grouping>_` name prefixes
/// (`None` when raw group names are requested); `name_fn` is the consuming
/// engine's group name transformation.
pub struct RegionTreeBuilder<'a> {
    tables: &'a LookupTables,
    region_prefix: Option<&'a str>,
    site_prefix: Option<&'a str>,
    name_fn: &'a dyn Fn(&str) -> String,
}

impl<'a> RegionTreeBuilder<'a> {
    pub fn new(
        tables: &'a LookupTables,
        region_prefix: Option<&'a str>,
        site_prefix: Option<&'a str>,
        name_fn: &'a dyn Fn(&str) -> String,
    ) -> Self {
        Self {
            tables,
            region_prefix,
            site_prefix,
            name_fn,
        }
    }

    fn group_name(&self, prefix: Option<&str>, value: &str) -> String {
        match prefix {
            Some(prefix) => (self.name_fn)(&format!("{prefix}_{value}")),
            None => (self.name_fn)(value),
        }
    }

    /// Create the region forest. Idempotent: building twice over the same
    /// tables yields identical groups and edges.
    pub fn build(&self, inventory: &mut Inventory) {
        // One group per region, keyed for the edge passes below
        let mut region_groups: HashMap<u64, String> = HashMap::new();
        for (id, slug) in &self.tables.regions {
            let name = self.group_name(self.region_prefix, slug);
            inventory.ensure_group(&name);
            region_groups.insert(*id, name);
        }

        // Parent -> child edges between region groups
        for (id, parent_id) in &self.tables.region_parents {
            if let Some(child) = region_groups.get(id)
                && let Some(parent) = region_groups.get(parent_id)
            {
                inventory.add_child(parent, child);
            }
        }

        // Site groups nest under their region's group; the site group may
        // not exist yet when hosts were not grouped by site
        for (site_id, region_id) in &self.tables.site_regions {
            let Some(region_group) = region_groups.get(region_id) else {
                continue;
            };
            let Some(site_slug) = self.tables.sites.get(site_id) else {
                continue;
            };
            let site_group = self.group_name(self.site_prefix, site_slug);
            inventory.add_child(region_group, &site_group);
        }

        debug!(regions = region_groups.len(), "region groups built");
    }
}
