//! Shared test utilities and fixtures for the neglb test suite.
//!
//! This module provides:
//! - `FakeProvider`, an in-memory `Provider` recording every call
//! - Failure injection by call label
//! - Config and NEG fixtures
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use neglb::config::Config;
use neglb::gcp::types::{Change, NetworkEndpointGroup, Operation, ResourceRecordSet};
use neglb::provider::{Provider, ResourceKind};
use neglb::{Error, Result};

pub const PROJECT: &str = "acme-prod";
pub const SERVICE: &str = "shop";
pub const DNS_ENTRY: &str = "shop.example.com";

// ============================================================================
// Fixtures
// ============================================================================

/// A valid config with no settle delay
pub fn test_config() -> Config {
    Config {
        project: PROJECT.to_string(),
        service: SERVICE.to_string(),
        health_check_path: "/healthz".to_string(),
        dns_entry: DNS_ENTRY.to_string(),
        settle_delay: Duration::ZERO,
        ..Config::default()
    }
}

pub fn neg(name: &str, zone: &str) -> NetworkEndpointGroup {
    NetworkEndpointGroup {
        name: name.to_string(),
        self_link: format!(
            "https://compute.test/projects/{}/zones/{}/networkEndpointGroups/{}",
            PROJECT, zone, name
        ),
        zone: Some(zone.to_string()),
        network_endpoint_type: Some("GCE_VM_IP_PORT".to_string()),
        size: Some(2),
    }
}

/// NEGs of several services spread over three zones
pub fn mixed_negs() -> Vec<NetworkEndpointGroup> {
    vec![
        neg("k8s1-4f2a-default-shop-80-9c1d", "europe-west1-b"),
        neg("k8s1-4f2a-default-shop-80-9c1d", "europe-west1-c"),
        neg("k8s1-4f2a-default-shop-443-77aa", "europe-west1-b"),
        neg("k8s1-4f2a-default-cart-80-1e2f", "europe-west1-b"),
        neg("k8s1-4f2a-default-shop-80-9c1d", "europe-west1-d"),
        neg("unrelated-neg", "europe-west1-d"),
    ]
}

// ============================================================================
// Fake Provider
// ============================================================================

/// A call made against the fake provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ResourceKind),
    Get(ResourceKind, String),
    Insert(ResourceKind, String),
    Update(ResourceKind, String),
    ListNegs,
    ListRecordSets(String),
    CreateChange(String),
}

impl Call {
    /// Label used for failure injection and assertions
    pub fn label(&self) -> String {
        match self {
            Call::List(kind) => format!("list {}", kind),
            Call::Get(kind, name) => format!("get {}/{}", kind, name),
            Call::Insert(kind, name) => format!("insert {}/{}", kind, name),
            Call::Update(kind, name) => format!("update {}/{}", kind, name),
            Call::ListNegs => "aggregatedList networkEndpointGroups".to_string(),
            Call::ListRecordSets(zone) => format!("list rrsets/{}", zone),
            Call::CreateChange(zone) => format!("change {}", zone),
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::Insert(..) | Call::Update(..) | Call::CreateChange(_)
        )
    }
}

#[derive(Default)]
struct State {
    resources: HashMap<ResourceKind, Vec<Value>>,
    negs: Vec<NetworkEndpointGroup>,
    rrsets: HashMap<String, Vec<ResourceRecordSet>>,
    calls: Vec<Call>,
    fail_on: Option<String>,
    next_ip: u8,
}

/// In-memory stand-in for the Compute and DNS APIs
pub struct FakeProvider {
    project: String,
    state: Mutex<State>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            project: PROJECT.to_string(),
            state: Mutex::new(State {
                next_ip: 10,
                ..State::default()
            }),
        }
    }

    pub fn with_negs(self, negs: Vec<NetworkEndpointGroup>) -> Self {
        self.state.lock().negs = negs;
        self
    }

    /// Pre-existing resource; a self link is added when missing
    pub fn with_resource(self, kind: ResourceKind, mut value: Value) -> Self {
        if value.get("selfLink").is_none() {
            let name = value["name"].as_str().unwrap_or_default().to_string();
            value["selfLink"] = json!(self.resource_link(kind, &name));
        }
        self.state.lock().resources.entry(kind).or_default().push(value);
        self
    }

    pub fn with_record(self, zone: &str, record: ResourceRecordSet) -> Self {
        self.state
            .lock()
            .rrsets
            .entry(zone.to_string())
            .or_default()
            .push(record);
        self
    }

    /// Fail every call whose label starts with `label`
    pub fn fail_on(self, label: &str) -> Self {
        self.state.lock().fail_on = Some(label.to_string());
        self
    }

    pub fn clear_failure(&self) {
        self.state.lock().fail_on = None;
    }

    pub fn set_negs(&self, negs: Vec<NetworkEndpointGroup>) {
        self.state.lock().negs = negs;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Labels of every mutating call, in order
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.is_mutation())
            .map(Call::label)
            .collect()
    }

    pub fn resources(&self, kind: ResourceKind) -> Vec<Value> {
        self.state
            .lock()
            .resources
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn resource(&self, kind: ResourceKind, name: &str) -> Option<Value> {
        self.resources(kind)
            .into_iter()
            .find(|v| v["name"] == json!(name))
    }

    pub fn record_sets(&self, zone: &str) -> Vec<ResourceRecordSet> {
        self.state
            .lock()
            .rrsets
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) -> Result<()> {
        let label = call.label();
        let mut state = self.state.lock();
        state.calls.push(call);
        match &state.fail_on {
            Some(pattern) if label.starts_with(pattern.as_str()) => {
                Err(Error::api(label, 500, "injected failure"))
            }
            _ => Ok(()),
        }
    }

    fn operation(name: &str) -> Operation {
        Operation {
            name: format!("operation-{}", name),
            status: Some("RUNNING".to_string()),
            ..Operation::default()
        }
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn project(&self) -> &str {
        &self.project
    }

    fn resource_link(&self, kind: ResourceKind, name: &str) -> String {
        format!(
            "https://compute.test/projects/{}/global/{}/{}",
            self.project,
            kind.collection(),
            name
        )
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<Value>> {
        self.record(Call::List(kind))?;
        Ok(self.resources(kind))
    }

    async fn get(&self, kind: ResourceKind, name: &str) -> Result<Value> {
        self.record(Call::Get(kind, name.to_string()))?;
        self.resource(kind, name).ok_or_else(|| Error::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        })
    }

    async fn insert(&self, kind: ResourceKind, mut body: Value) -> Result<Operation> {
        let name = body["name"].as_str().unwrap_or_default().to_string();
        self.record(Call::Insert(kind, name.clone()))?;

        if self.resource(kind, &name).is_some() {
            return Err(Error::api(
                format!("insert {}", kind),
                409,
                format!("The resource '{}' already exists", name),
            ));
        }

        body["selfLink"] = json!(self.resource_link(kind, &name));
        let mut state = self.state.lock();
        if kind == ResourceKind::GlobalAddress && body.get("address").is_none() {
            body["address"] = json!(format!("203.0.113.{}", state.next_ip));
            state.next_ip += 1;
        }
        state.resources.entry(kind).or_default().push(body);

        Ok(Self::operation(&name))
    }

    async fn update(&self, kind: ResourceKind, name: &str, body: Value) -> Result<Operation> {
        self.record(Call::Update(kind, name.to_string()))?;

        let mut state = self.state.lock();
        let slot = state
            .resources
            .get_mut(&kind)
            .and_then(|items| items.iter_mut().find(|v| v["name"] == json!(name)))
            .ok_or_else(|| Error::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            })?;
        *slot = body;

        Ok(Self::operation(name))
    }

    async fn list_network_endpoint_groups(&self) -> Result<Vec<NetworkEndpointGroup>> {
        self.record(Call::ListNegs)?;
        Ok(self.state.lock().negs.clone())
    }

    async fn list_record_sets(&self, zone: &str) -> Result<Vec<ResourceRecordSet>> {
        self.record(Call::ListRecordSets(zone.to_string()))?;
        Ok(self.record_sets(zone))
    }

    async fn create_change(&self, zone: &str, change: &Change) -> Result<Change> {
        self.record(Call::CreateChange(zone.to_string()))?;

        let mut state = self.state.lock();
        state
            .rrsets
            .entry(zone.to_string())
            .or_default()
            .extend(change.additions.iter().cloned());

        Ok(Change {
            id: Some("1".to_string()),
            status: Some("pending".to_string()),
            ..change.clone()
        })
    }
}
