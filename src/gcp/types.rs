//! Wire types for the Compute Engine v1 and Cloud DNS v1 REST APIs.
//!
//! Only the fields this tool reads or writes are modelled. Field names follow
//! the APIs' JSON (camelCase, with the odd `IPAddress` exception).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::provider::ResourceKind;

/// A global Compute resource managed by one ensure step
pub trait ComputeResource: Serialize + serde::de::DeserializeOwned + Send + Sync {
    /// Collection the resource lives in
    const KIND: ResourceKind;

    /// Resource name
    fn name(&self) -> &str;

    /// Server-assigned self link, once known
    fn self_link(&self) -> Option<&str>;

    /// Set the self link (used when synthesizing a planned resource)
    fn set_self_link(&mut self, link: String);
}

macro_rules! compute_resource {
    ($ty:ty, $kind:expr) => {
        impl ComputeResource for $ty {
            const KIND: ResourceKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn self_link(&self) -> Option<&str> {
                self.self_link.as_deref()
            }

            fn set_self_link(&mut self, link: String) {
                self.self_link = Some(link);
            }
        }
    };
}

/// HTTP health check settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpHealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// `compute#healthCheck`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_health_check: Option<HttpHealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(HealthCheck, ResourceKind::HealthCheck);

/// One backend of a backend service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancing_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<u32>,
}

/// `compute#backendService`
///
/// Fields not modelled here are kept in `extra` so that a read-modify-update
/// cycle does not reset them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendService {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_checks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub backends: Vec<Backend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

compute_resource!(BackendService, ResourceKind::BackendService);

/// `compute#networkEndpointGroup`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEndpointGroup {
    pub name: String,
    #[serde(default)]
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_endpoint_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Managed certificate settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCertificate {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// `compute#sslCertificate`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCertificate {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub cert_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed: Option<ManagedCertificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(SslCertificate, ResourceKind::SslCertificate);

/// `compute#urlMap`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMap {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(UrlMap, ResourceKind::UrlMap);

/// `compute#targetHttpsProxy`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHttpsProxy {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_map: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssl_certificates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(TargetHttpsProxy, ResourceKind::TargetHttpsProxy);

/// `compute#address` (global)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(Address, ResourceKind::GlobalAddress);

/// `compute#forwardingRule` (global)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRule {
    pub name: String,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "IPProtocol", skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(ForwardingRule, ResourceKind::ForwardingRule);

/// Error block of a Compute operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

/// One entry of an operation error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// `compute#operation`, returned by insert and update calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl Operation {
    /// Joined error messages, if the operation failed
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        if error.errors.is_empty() {
            return None;
        }
        Some(
            error
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// One page of a Compute list call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Per-scope entry of the aggregated NEG list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegScope {
    #[serde(default)]
    pub network_endpoint_groups: Vec<NetworkEndpointGroup>,
}

/// One page of `networkEndpointGroups.aggregatedList`, keyed by zone/region
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegAggregatedPage {
    #[serde(default)]
    pub items: IndexMap<String, NegScope>,
    pub next_page_token: Option<String>,
}

/// `dns#resourceRecordSet`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

/// One page of `resourceRecordSets.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSetPage {
    #[serde(default)]
    pub rrsets: Vec<ResourceRecordSet>,
    pub next_page_token: Option<String>,
}

/// `dns#change`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
