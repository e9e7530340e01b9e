//! The cloud provider seam.
//!
//! Provisioning steps talk to the cloud only through [`Provider`], so the
//! same orchestration runs against [`GcpClient`](crate::gcp::GcpClient) or an
//! in-memory double in tests. Global Compute collections are addressed by
//! [`ResourceKind`] and exchanged as JSON; the steps convert to and from the
//! typed descriptors in [`crate::gcp::types`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::gcp::types::{Change, NetworkEndpointGroup, Operation, ResourceRecordSet};

/// Global Compute collections managed by this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    HealthCheck,
    BackendService,
    SslCertificate,
    UrlMap,
    TargetHttpsProxy,
    GlobalAddress,
    ForwardingRule,
}

impl ResourceKind {
    /// Every kind, in the order the orchestrator ensures them
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::HealthCheck,
        ResourceKind::BackendService,
        ResourceKind::SslCertificate,
        ResourceKind::UrlMap,
        ResourceKind::TargetHttpsProxy,
        ResourceKind::GlobalAddress,
        ResourceKind::ForwardingRule,
    ];

    /// Suffix appended to the service name
    pub fn suffix(&self) -> &'static str {
        match self {
            ResourceKind::HealthCheck => "hc",
            ResourceKind::BackendService => "be",
            ResourceKind::SslCertificate => "cert",
            ResourceKind::UrlMap => "um",
            ResourceKind::TargetHttpsProxy => "tp",
            ResourceKind::GlobalAddress => "ip",
            ResourceKind::ForwardingRule => "fw",
        }
    }

    /// REST collection name under `projects/{project}/global/`
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::HealthCheck => "healthChecks",
            ResourceKind::BackendService => "backendServices",
            ResourceKind::SslCertificate => "sslCertificates",
            ResourceKind::UrlMap => "urlMaps",
            ResourceKind::TargetHttpsProxy => "targetHttpsProxies",
            ResourceKind::GlobalAddress => "addresses",
            ResourceKind::ForwardingRule => "forwardingRules",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Operations the provisioning run needs from the cloud
#[async_trait]
pub trait Provider: Send + Sync {
    /// Project every call is scoped to
    fn project(&self) -> &str;

    /// Self link the provider assigns to a global resource of this name
    fn resource_link(&self, kind: ResourceKind, name: &str) -> String;

    /// List every resource of a global collection
    async fn list(&self, kind: ResourceKind) -> Result<Vec<serde_json::Value>>;

    /// Fetch one resource by name
    async fn get(&self, kind: ResourceKind, name: &str) -> Result<serde_json::Value>;

    /// Create a resource
    async fn insert(&self, kind: ResourceKind, body: serde_json::Value) -> Result<Operation>;

    /// Replace a resource wholesale
    async fn update(
        &self,
        kind: ResourceKind,
        name: &str,
        body: serde_json::Value,
    ) -> Result<Operation>;

    /// List NEGs across every zone and region of the project
    async fn list_network_endpoint_groups(&self) -> Result<Vec<NetworkEndpointGroup>>;

    /// List record sets of a managed zone
    async fn list_record_sets(&self, zone: &str) -> Result<Vec<ResourceRecordSet>>;

    /// Apply a record-set change to a managed zone
    async fn create_change(&self, zone: &str, change: &Change) -> Result<Change>;
}
