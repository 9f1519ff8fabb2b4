//! End-to-end assembly tests over a scripted catalog transport

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use rackmap_catalog::{CachePolicy, CatalogError, CatalogFetch};
use rackmap_inventory::{InventoryAssembler, InventoryConfig, InventoryError};

/// In-memory catalog: exact-URL responses, an empty page for anything
/// unscripted, and optional failing endpoints
struct MockCatalog {
    responses: HashMap<String, Value>,
    fail_on: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockCatalog {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fail_on: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn respond(mut self, url: &str, results: Value) -> Self {
        self.responses
            .insert(url.to_string(), json!({"results": results, "next": null}));
        self
    }

    fn respond_page(mut self, url: &str, results: Value, next: &str) -> Self {
        self.responses
            .insert(url.to_string(), json!({"results": results, "next": next}));
        self
    }

    fn fail_when_url_contains(mut self, fragment: &str) -> Self {
        self.fail_on.push(fragment.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogFetch for MockCatalog {
    async fn fetch(&self, url: &str, _policy: CachePolicy) -> rackmap_catalog::Result<Value> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_on.iter().any(|fragment| url.contains(fragment)) {
            return Err(CatalogError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            });
        }
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| json!({"results": [], "next": null})))
    }
}

const BASE: &str = "https://catalog.test/api";

fn config(extra: &str) -> InventoryConfig {
    let raw = format!(
        r#"
        api_endpoint = "{BASE}"
        token = "0123456789abcdef"
        {extra}
        "#
    );
    toml::from_str(&raw).unwrap()
}

fn lookup_url(path: &str) -> String {
    format!("{BASE}/{path}?limit=0")
}

fn listing_url(path: &str) -> String {
    format!("{BASE}/{path}?limit=0&exclude=config_context")
}

#[tokio::test]
async fn test_grouping_and_hostvars_end_to_end() {
    let catalog = MockCatalog::new()
        .respond(&lookup_url("dcim/sites/"), json!([{"id": 10, "slug": "site-a"}]))
        .respond(&lookup_url("dcim/device-roles/"), json!([{"id": 5, "slug": "core"}]))
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1", "site": {"id": 10}, "device_role": {"id": 5}}]),
        );

    let config = config(
        r#"
        plurals = true
        group_by = ["sites", "device_roles"]
        "#,
    );
    let assembler = InventoryAssembler::with_fetcher(config, Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    assert!(inventory.groups["sites_site-a"].hosts.contains("R1"));
    assert!(inventory.groups["device_roles_core"].hosts.contains("R1"));

    let vars = inventory.host_variables("R1").unwrap();
    assert_eq!(vars["site"], json!(["site-a"]));
    assert_eq!(vars["device_role"], json!(["core"]));
}

#[tokio::test]
async fn test_empty_host_name_gets_generated_identifier() {
    let catalog = MockCatalog::new().respond(
        &listing_url("dcim/devices/"),
        json!([{"id": 7, "name": ""}]),
    );

    let assembler = InventoryAssembler::with_fetcher(config(""), Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    assert_eq!(inventory.hostvars.len(), 1);
    let name = inventory.hostvars.keys().next().unwrap();
    assert!(!name.is_empty());
    assert_eq!(name.len(), 36, "expected a generated UUID, got {name}");
}

#[tokio::test]
async fn test_extraction_sees_fully_paginated_lookup_tables() {
    // The device's site arrives on the second page of the sites listing;
    // the join barrier must still make it visible to extraction.
    let catalog = MockCatalog::new()
        .respond_page(
            &lookup_url("dcim/sites/"),
            json!([{"id": 10, "slug": "den01"}]),
            &format!("{BASE}/dcim/sites/?limit=0&offset=50"),
        )
        .respond(
            &format!("{BASE}/dcim/sites/?limit=0&offset=50"),
            json!([{"id": 11, "slug": "fra02"}]),
        )
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1", "site": {"id": 11}}]),
        );

    let assembler = InventoryAssembler::with_fetcher(config(""), Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    assert_eq!(
        inventory.host_variables("R1").unwrap()["site"],
        json!("fra02")
    );
}

#[tokio::test]
async fn test_single_lookup_failure_aborts_the_run() {
    let catalog = MockCatalog::new()
        .fail_when_url_contains("tenancy/tenants")
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1"}]),
        );

    let assembler = InventoryAssembler::with_fetcher(config(""), Arc::new(catalog));
    let err = assembler.assemble().await.unwrap_err();

    assert!(matches!(
        err,
        InventoryError::Catalog(CatalogError::Api { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_resource_class_skipped_when_no_global_filter_validates() {
    // cluster is a VM-only filter parameter
    let catalog = MockCatalog::new();
    let config = config(r#"query_filters = [{ cluster = "pve-lab" }]"#);

    let assembler = InventoryAssembler::with_fetcher(config, Arc::new(catalog));
    let _ = assembler.assemble().await.unwrap();
}

#[tokio::test]
async fn test_skipped_class_is_never_fetched() {
    let catalog = Arc::new(MockCatalog::new());
    let config = config(r#"query_filters = [{ cluster = "pve-lab" }]"#);

    let assembler = InventoryAssembler::with_fetcher(config, catalog.clone());
    let _ = assembler.assemble().await.unwrap();

    let calls = catalog.calls();
    assert!(!calls.iter().any(|url| url.contains("dcim/devices")));
    assert!(
        calls
            .iter()
            .any(|url| url.contains("virtual-machines") && url.contains("cluster=pve-lab"))
    );
}

#[tokio::test]
async fn test_unknown_group_by_key_is_a_config_error() {
    let catalog = MockCatalog::new();
    let config = config(r#"group_by = ["flavors"]"#);

    let assembler = InventoryAssembler::with_fetcher(config, Arc::new(catalog));
    let err = assembler.assemble().await.unwrap_err();

    match err {
        InventoryError::Config(message) => assert!(message.contains("flavors")),
        other => panic!("expected a config error, got {other}"),
    }
}

#[tokio::test]
async fn test_region_grouping_nests_sites_under_regions() {
    let catalog = MockCatalog::new()
        .respond(
            &lookup_url("dcim/sites/"),
            json!([{"id": 10, "slug": "den01", "region": {"id": 3}}]),
        )
        .respond(
            &lookup_url("dcim/regions/"),
            json!([
                {"id": 3, "slug": "us-west", "parent": {"id": 2}},
                {"id": 2, "slug": "us", "parent": null},
            ]),
        )
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1", "site": {"id": 10}}]),
        );

    let config = config(r#"group_by = ["region", "site"]"#);
    let assembler = InventoryAssembler::with_fetcher(config, Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    assert!(inventory.groups["site_den01"].hosts.contains("R1"));
    assert!(inventory.groups["region_us-west"].children.contains("site_den01"));
    assert!(inventory.groups["region_us"].children.contains("region_us-west"));
    assert_eq!(
        inventory.host_variables("R1").unwrap()["regions"],
        json!(["us-west", "us"])
    );
}

#[tokio::test]
async fn test_interfaces_joined_with_ip_addresses() {
    let catalog = MockCatalog::new()
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1"}]),
        )
        .respond(
            &format!("{BASE}/dcim/interfaces/?limit=0&device_id=1"),
            json!([{"id": 100, "name": "eth0"}, {"id": 101, "name": "eth1"}]),
        )
        .respond(
            &format!("{BASE}/ipam/ip-addresses/?limit=0&device_id=1"),
            json!([
                {"id": 9000, "address": "192.0.2.10/24", "interface": {"id": 100}},
                {"id": 9001, "address": "192.0.2.11/24", "interface": {"id": 100}},
            ]),
        );

    let config = config("interfaces = true");
    let assembler = InventoryAssembler::with_fetcher(config, Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    let interfaces = &inventory.host_variables("R1").unwrap()["interfaces"];
    assert_eq!(interfaces[0]["name"], json!("eth0"));
    assert_eq!(interfaces[0]["ip_addresses"].as_array().unwrap().len(), 2);
    assert_eq!(interfaces[1]["ip_addresses"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_services_fetched_per_host_by_name() {
    let catalog = MockCatalog::new()
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1"}]),
        )
        .respond(
            &format!("{BASE}/ipam/services/?limit=0&device=R1"),
            json!([{"id": 40, "name": "dns", "ports": [53]}]),
        );

    let config = config("services = true");
    let assembler = InventoryAssembler::with_fetcher(config, Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    let services = &inventory.host_variables("R1").unwrap()["services"];
    assert_eq!(services[0]["name"], json!("dns"));
}

#[tokio::test]
async fn test_primary_ip_always_present_when_exposed() {
    let catalog = MockCatalog::new().respond(
        &listing_url("dcim/devices/"),
        json!([{
            "id": 1,
            "name": "R1",
            "primary_ip4": {"address": "192.0.2.10/24"},
        }]),
    );

    let assembler = InventoryAssembler::with_fetcher(config(""), Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    let vars = inventory.host_variables("R1").unwrap();
    assert_eq!(vars["primary_ip4"], json!("192.0.2.10"));
    assert!(!vars.contains_key("primary_ip6"));
}

#[tokio::test]
async fn test_devices_and_vms_merged() {
    let catalog = MockCatalog::new()
        .respond(
            &listing_url("dcim/devices/"),
            json!([{"id": 1, "name": "R1", "device_role": {"id": 5}}]),
        )
        .respond(
            &listing_url("virtualization/virtual-machines/"),
            json!([{"id": 2, "name": "vm1", "role": {"id": 5}}]),
        );

    let assembler = InventoryAssembler::with_fetcher(config(""), Arc::new(catalog));
    let inventory = assembler.assemble().await.unwrap();

    assert_eq!(inventory.hostvars.len(), 2);
    assert_eq!(
        inventory.host_variables("R1").unwrap()["is_virtual"],
        json!(false)
    );
    assert_eq!(
        inventory.host_variables("vm1").unwrap()["is_virtual"],
        json!(true)
    );
}
