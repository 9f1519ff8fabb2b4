//! Assembled inventory model
//!
//! Named groups with host membership and parent/child edges, plus a
//! per-host variable map. BTree containers keep the emitted JSON stable
//! across runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value, json};

/// One named group
#[derive(Debug, Clone, Default, Serialize)]
pub struct Group {
    /// Member host identifiers
    pub hosts: BTreeSet<String>,
    /// Child group names
    pub children: BTreeSet<String>,
}

/// The assembled inventory
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    /// Groups by name
    pub groups: BTreeMap<String, Group>,
    /// Per-host variable maps
    pub hostvars: BTreeMap<String, Map<String, Value>>,
}

impl Inventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a group; creating the same group twice never
    /// duplicates it or loses existing members
    pub fn ensure_group(&mut self, name: &str) -> &mut Group {
        self.groups.entry(name.to_string()).or_default()
    }

    /// Add a host to a group, creating the group if needed
    pub fn add_host(&mut self, group: &str, host: &str) {
        self.ensure_group(group).hosts.insert(host.to_string());
    }

    /// Register a parent -> child group edge, creating both if needed
    pub fn add_child(&mut self, parent: &str, child: &str) {
        self.ensure_group(child);
        self.ensure_group(parent).children.insert(child.to_string());
    }

    /// Variables recorded for one host, if any
    #[must_use]
    pub fn host_variables(&self, host: &str) -> Option<&Map<String, Value>> {
        self.hostvars.get(host)
    }

    /// Render the dynamic-inventory JSON shape: one object per group plus
    /// `_meta.hostvars`
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for (name, group) in &self.groups {
            root.insert(
                name.clone(),
                json!({
                    "hosts": group.hosts,
                    "children": group.children,
                }),
            );
        }
        root.insert(
            "_meta".to_string(),
            json!({ "hostvars": self.hostvars }),
        );
        Value::Object(root)
    }
}

/// Group name rule used by common automation engines: lowercase, any run
/// of characters outside `[a-z0-9_]` becomes a single underscore. Group
/// names pass through unchanged unless a consumer installs this (or its
/// own rule) on the assembler.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_creation_is_idempotent() {
        let mut inv = Inventory::new();
        inv.add_host("sites_den01", "r1");
        inv.add_host("sites_den01", "r2");
        inv.ensure_group("sites_den01");

        assert_eq!(inv.groups.len(), 1);
        assert_eq!(inv.groups["sites_den01"].hosts.len(), 2);
    }

    #[test]
    fn test_add_child_creates_both_groups() {
        let mut inv = Inventory::new();
        inv.add_child("region_emea", "sites_fra02");

        assert!(inv.groups.contains_key("region_emea"));
        assert!(inv.groups.contains_key("sites_fra02"));
        assert!(inv.groups["region_emea"].children.contains("sites_fra02"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Site A/B"), "site_a_b");
        assert_eq!(sanitize_name("den01"), "den01");
        assert_eq!(sanitize_name("Rack 12"), "rack_12");
    }

    #[test]
    fn test_json_shape() {
        let mut inv = Inventory::new();
        inv.add_host("sites_den01", "r1");
        inv.hostvars
            .insert("r1".to_string(), Map::from_iter([("site".to_string(), serde_json::json!("den01"))]));

        let out = inv.to_json();

        assert_eq!(out["sites_den01"]["hosts"], serde_json::json!(["r1"]));
        assert_eq!(out["_meta"]["hostvars"]["r1"]["site"], serde_json::json!("den01"));
    }
}
