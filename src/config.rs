//! Configuration module for neglb
//!
//! Handles loading the provisioning configuration:
//! - The config file (`config.json` by default; YAML and TOML by extension)
//! - Environment variable overrides (`NEGLB_*`)
//! - Validation of the four required fields before any API call is made

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::provider::ResourceKind;

/// Default path of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default Compute Engine API base URL
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

/// Default Cloud DNS API base URL
pub const DEFAULT_DNS_ENDPOINT: &str = "https://dns.googleapis.com/dns/v1";

/// Longest suffix appended to the service name ("-cert")
const LONGEST_SUFFIX: usize = 5;

/// GCP resource names are at most 63 characters
const MAX_RESOURCE_NAME: usize = 63;

static RESOURCE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

/// How the URL map step behaves when the map does not exist yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UrlMapMode {
    /// Create the URL map through the Compute API
    #[default]
    Api,
    /// Print the equivalent gcloud command and stop the run
    Manual,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GCP project ID
    pub project: String,

    /// Service name; every managed resource is named `<service>-<suffix>`
    pub service: String,

    /// HTTP path probed by the health check
    #[serde(rename = "healthcheck_request_path")]
    pub health_check_path: String,

    /// DNS name pointed at the load balancer
    pub dns_entry: String,

    /// Cloud DNS managed zone holding `dns_entry`
    pub dns_zone: String,

    /// Port used by the health check and backend service
    pub port: u16,

    /// Max rate configured on every NEG backend
    pub max_rate: u32,

    /// Fixed delay after each create call
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// URL map creation policy
    pub url_map_mode: UrlMapMode,

    /// Compute Engine API base URL
    pub compute_endpoint: String,

    /// Cloud DNS API base URL
    pub dns_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: String::new(),
            service: String::new(),
            health_check_path: String::new(),
            dns_entry: String::new(),
            dns_zone: "dns".to_string(),
            port: 8080,
            max_rate: 9999,
            settle_delay: Duration::from_secs(10),
            url_map_mode: UrlMapMode::default(),
            compute_endpoint: DEFAULT_COMPUTE_ENDPOINT.to_string(),
            dns_endpoint: DEFAULT_DNS_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Load, override from the environment, and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without applying overrides or validation
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse config content, choosing the format from the path's extension
    fn parse(content: &str, path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let parsed = match extension {
            "yml" | "yaml" => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            "toml" => toml::from_str(content).map_err(|e| e.to_string()),
            _ => serde_json::from_str(content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| Error::ConfigParse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // NEGLB_PROJECT
        if let Ok(project) = std::env::var("NEGLB_PROJECT") {
            self.project = project;
        }

        // NEGLB_SERVICE
        if let Ok(service) = std::env::var("NEGLB_SERVICE") {
            self.service = service;
        }

        // NEGLB_HEALTHCHECK_REQUEST_PATH
        if let Ok(path) = std::env::var("NEGLB_HEALTHCHECK_REQUEST_PATH") {
            self.health_check_path = path;
        }

        // NEGLB_DNS_ENTRY
        if let Ok(entry) = std::env::var("NEGLB_DNS_ENTRY") {
            self.dns_entry = entry;
        }

        // NEGLB_DNS_ZONE
        if let Ok(zone) = std::env::var("NEGLB_DNS_ZONE") {
            self.dns_zone = zone;
        }
    }

    /// Reject configs the provisioning run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(Error::validation("project cannot be blank"));
        }
        if self.service.trim().is_empty() {
            return Err(Error::validation("service cannot be blank"));
        }
        if self.health_check_path.trim().is_empty() {
            return Err(Error::validation("healthcheck_request_path cannot be blank"));
        }
        if self.dns_entry.trim().is_empty() {
            return Err(Error::validation("dns_entry cannot be blank"));
        }
        if self.dns_zone.trim().is_empty() {
            return Err(Error::validation("dns_zone cannot be blank"));
        }

        if !RESOURCE_NAME_RE.is_match(&self.service) {
            return Err(Error::validation(format!(
                "service '{}' must start with a lowercase letter and contain only lowercase letters, digits and hyphens",
                self.service
            )));
        }
        if self.service.len() + LONGEST_SUFFIX > MAX_RESOURCE_NAME {
            return Err(Error::validation(format!(
                "service '{}' is too long; resource names are limited to {} characters",
                self.service, MAX_RESOURCE_NAME
            )));
        }

        if !self.health_check_path.starts_with('/') {
            return Err(Error::validation(format!(
                "healthcheck_request_path '{}' must start with '/'",
                self.health_check_path
            )));
        }

        for (field, endpoint) in [
            ("compute_endpoint", &self.compute_endpoint),
            ("dns_endpoint", &self.dns_endpoint),
        ] {
            url::Url::parse(endpoint).map_err(|e| {
                Error::validation(format!("{} '{}' is not a valid URL: {}", field, endpoint, e))
            })?;
        }

        Ok(())
    }

    /// Name of the managed resource of the given kind
    pub fn resource_name(&self, kind: ResourceKind) -> String {
        format!("{}-{}", self.service, kind.suffix())
    }

    /// Substring identifying the service's NEGs
    pub fn neg_pattern(&self) -> String {
        format!("{}-80", self.service)
    }

    /// Fully qualified, lower-cased DNS name (with trailing dot), as Cloud
    /// DNS returns it
    pub fn dns_fqdn(&self) -> String {
        format!("{}.", self.dns_domain())
    }

    /// Lower-cased DNS name without the trailing dot, as used in certificate
    /// domains
    pub fn dns_domain(&self) -> String {
        self.dns_entry.trim_end_matches('.').to_ascii_lowercase()
    }
}

/// Resolve the config path: explicit argument first, then the default
pub fn config_path(explicit: Option<&PathBuf>) -> PathBuf {
    explicit
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            project: "acme-prod".into(),
            service: "shop".into(),
            health_check_path: "/healthz".into(),
            dns_entry: "shop.example.com".into(),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dns_zone, "dns");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_rate, 9999);
        assert_eq!(config.settle_delay, Duration::from_secs(10));
        assert_eq!(config.url_map_mode, UrlMapMode::Api);
    }

    #[test]
    fn test_parse_json_field_names() {
        let json = r#"{
            "project": "acme-prod",
            "service": "shop",
            "healthcheck_request_path": "/healthz",
            "dns_entry": "shop.example.com."
        }"#;
        let config = Config::parse(json, Path::new("config.json")).unwrap();
        assert_eq!(config.health_check_path, "/healthz");
        assert_eq!(config.dns_entry, "shop.example.com.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_with_duration() {
        let yaml = "project: acme-prod\nservice: shop\nhealthcheck_request_path: /healthz\ndns_entry: shop.example.com\nsettle_delay: 2s\nurl_map_mode: manual\n";
        let config = Config::parse(yaml, Path::new("neglb.yaml")).unwrap();
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.url_map_mode, UrlMapMode::Manual);
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut config = valid();
        config.project = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("project"));

        let mut config = valid();
        config.service = "  ".into();
        assert!(config.validate().unwrap_err().to_string().contains("service"));

        let mut config = valid();
        config.health_check_path = String::new();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("healthcheck_request_path"));

        let mut config = valid();
        config.dns_entry = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("dns_entry"));
    }

    #[test]
    fn test_validate_rejects_bad_service_names() {
        let too_long = "s".repeat(59);
        for bad in ["Shop", "shop_api", "9shop", "shop-", too_long.as_str()] {
            let mut config = valid();
            config.service = bad.to_string();
            assert!(config.validate().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_resource_names() {
        let config = valid();
        assert_eq!(config.resource_name(ResourceKind::HealthCheck), "shop-hc");
        assert_eq!(config.resource_name(ResourceKind::ForwardingRule), "shop-fw");
        assert_eq!(config.neg_pattern(), "shop-80");
        assert_eq!(config.dns_fqdn(), "shop.example.com.");
        assert_eq!(config.dns_domain(), "shop.example.com");
    }

    #[test]
    fn test_dns_names_are_lower_cased() {
        let mut config = valid();
        config.dns_entry = "Shop.Example.COM.".into();
        assert_eq!(config.dns_fqdn(), "shop.example.com.");
        assert_eq!(config.dns_domain(), "shop.example.com");
    }
}
