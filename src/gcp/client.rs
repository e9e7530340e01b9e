//! REST client for the Compute Engine and Cloud DNS APIs
//!
//! This module provides the HTTP client behind the real [`Provider`]:
//!
//! - Bearer-token authentication
//! - Transparent `nextPageToken` pagination for list calls
//! - Decoding of Google's `{"error": {...}}` bodies into [`Error::Api`]
//!   (401 becomes [`Error::Auth`])
//! - Surfacing of failed Compute operations

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use super::auth;
use super::types::{
    Change, ListPage, NegAggregatedPage, NetworkEndpointGroup, Operation, RecordSetPage,
    ResourceRecordSet,
};
use crate::config::{Config, DEFAULT_COMPUTE_ENDPOINT, DEFAULT_DNS_ENDPOINT};
use crate::error::{Error, Result};
use crate::provider::{Provider, ResourceKind};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the GCP client
#[derive(Debug, Clone)]
pub struct GcpClientConfig {
    /// Project every call is scoped to
    pub project: String,
    /// Compute Engine API base URL
    pub compute_endpoint: String,
    /// Cloud DNS API base URL
    pub dns_endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// OAuth access token
    pub token: Option<String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for GcpClientConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            compute_endpoint: DEFAULT_COMPUTE_ENDPOINT.to_string(),
            dns_endpoint: DEFAULT_DNS_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token: None,
            user_agent: format!("neglb/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for creating a GcpClient
pub struct GcpClientBuilder {
    config: GcpClientConfig,
}

impl GcpClientBuilder {
    /// Create a new builder for a project
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            config: GcpClientConfig {
                project: project.into(),
                ..GcpClientConfig::default()
            },
        }
    }

    /// Set the Compute API base URL
    pub fn compute_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.compute_endpoint = url.into();
        self
    }

    /// Set the Cloud DNS API base URL
    pub fn dns_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.dns_endpoint = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the access token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the user agent string
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the client; a token must have been set
    pub fn build(self) -> Result<GcpClient> {
        GcpClient::from_config(self.config)
    }

    /// Build the client, resolving a token from the environment or gcloud
    /// when none was set
    pub async fn build_with_default_credentials(mut self) -> Result<GcpClient> {
        if self.config.token.is_none() {
            self.config.token = Some(auth::resolve_access_token().await?);
        }
        self.build()
    }
}

/// HTTP client for the Compute Engine v1 and Cloud DNS v1 APIs
pub struct GcpClient {
    /// The underlying HTTP client
    http: Client,
    /// Client configuration
    config: GcpClientConfig,
    /// Bearer token
    token: String,
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl GcpClient {
    /// Create a builder
    pub fn builder(project: impl Into<String>) -> GcpClientBuilder {
        GcpClientBuilder::new(project)
    }

    /// Create a builder preconfigured from the application config
    pub fn builder_for(config: &Config) -> GcpClientBuilder {
        GcpClientBuilder::new(&config.project)
            .compute_endpoint(&config.compute_endpoint)
            .dns_endpoint(&config.dns_endpoint)
    }

    fn from_config(config: GcpClientConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::Auth("no access token configured".to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http,
            config,
            token,
        })
    }

    /// URL of a Compute resource path under the project
    fn compute_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.config.compute_endpoint.trim_end_matches('/'),
            self.config.project,
            path.trim_start_matches('/')
        )
    }

    /// URL of a Cloud DNS resource path under the project
    fn dns_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.config.dns_endpoint.trim_end_matches('/'),
            self.config.project,
            path.trim_start_matches('/')
        )
    }

    fn global_url(&self, kind: ResourceKind) -> String {
        self.compute_url(&format!("global/{}", kind.collection()))
    }

    /// Send a request and decode the JSON response
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, operation: &str) -> Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        trace!("{} -> {}", operation, status);

        if status.is_success() {
            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| Error::decode(format!("{} response", operation), e));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        // 403 also covers disabled APIs and missing IAM permissions
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth(format!("{}: {}", operation, message)));
        }

        Err(Error::api(operation, status.as_u16(), message))
    }

    /// Send a mutating request and fail if the returned operation carries an error
    async fn send_operation(&self, request: RequestBuilder, operation: &str) -> Result<Operation> {
        let op: Operation = self.send(request, operation).await?;
        if let Some(message) = op.error_message() {
            return Err(Error::Operation {
                name: op.name,
                message,
            });
        }
        debug!("{} accepted as operation '{}'", operation, op.name);
        Ok(op)
    }
}

#[async_trait]
impl Provider for GcpClient {
    fn project(&self) -> &str {
        &self.config.project
    }

    fn resource_link(&self, kind: ResourceKind, name: &str) -> String {
        format!("{}/{}", self.global_url(kind), name)
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<serde_json::Value>> {
        let url = self.global_url(kind);
        let operation = format!("list {}", kind);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListPage<serde_json::Value> = self.send(request, &operation).await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn get(&self, kind: ResourceKind, name: &str) -> Result<serde_json::Value> {
        let request = self.http.get(format!("{}/{}", self.global_url(kind), name));
        match self.send(request, &format!("get {}", kind)).await {
            Err(Error::Api { status: 404, .. }) => Err(Error::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            }),
            other => other,
        }
    }

    async fn insert(&self, kind: ResourceKind, body: serde_json::Value) -> Result<Operation> {
        let request = self.http.post(self.global_url(kind)).json(&body);
        self.send_operation(request, &format!("insert {}", kind)).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        name: &str,
        body: serde_json::Value,
    ) -> Result<Operation> {
        let request = self
            .http
            .put(format!("{}/{}", self.global_url(kind), name))
            .json(&body);
        self.send_operation(request, &format!("update {}", kind)).await
    }

    async fn list_network_endpoint_groups(&self) -> Result<Vec<NetworkEndpointGroup>> {
        let url = self.compute_url("aggregated/networkEndpointGroups");
        let mut negs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: NegAggregatedPage = self
                .send(request, "aggregatedList networkEndpointGroups")
                .await?;
            for (scope, entry) in page.items {
                trace!(
                    "{} holds {} NEG(s)",
                    scope,
                    entry.network_endpoint_groups.len()
                );
                negs.extend(entry.network_endpoint_groups);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(negs)
    }

    async fn list_record_sets(&self, zone: &str) -> Result<Vec<ResourceRecordSet>> {
        let url = self.dns_url(&format!("managedZones/{}/rrsets", zone));
        let mut rrsets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: RecordSetPage = self.send(request, "list resourceRecordSets").await?;
            rrsets.extend(page.rrsets);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(rrsets)
    }

    async fn create_change(&self, zone: &str, change: &Change) -> Result<Change> {
        let request = self
            .http
            .post(self.dns_url(&format!("managedZones/{}/changes", zone)))
            .json(change);
        self.send(request, "create change").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_token() {
        let err = GcpClient::builder("acme-prod").build().err().unwrap();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_urls() {
        let client = GcpClient::builder("acme-prod")
            .compute_endpoint("http://localhost:1234/compute/v1/")
            .dns_endpoint("http://localhost:1234/dns/v1")
            .token("t")
            .build()
            .unwrap();

        assert_eq!(client.project(), "acme-prod");
        assert_eq!(
            client.resource_link(ResourceKind::UrlMap, "shop-um"),
            "http://localhost:1234/compute/v1/projects/acme-prod/global/urlMaps/shop-um"
        );
        assert_eq!(
            client.dns_url("managedZones/dns/rrsets"),
            "http://localhost:1234/dns/v1/projects/acme-prod/managedZones/dns/rrsets"
        );
    }

    #[test]
    fn test_default_config() {
        let config = GcpClientConfig::default();
        assert_eq!(config.compute_endpoint, DEFAULT_COMPUTE_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.user_agent.starts_with("neglb/"));
    }
}
