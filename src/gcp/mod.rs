//! Google Cloud access: authentication, the REST client and wire types.
//!
//! ## Authentication
//!
//! The access token is loaded from:
//!
//! 1. `GOOGLE_OAUTH_ACCESS_TOKEN`
//! 2. `gcloud auth print-access-token`
//!
//! ## Example
//!
//! ```rust,ignore
//! use neglb::gcp::GcpClient;
//! use neglb::provider::{Provider, ResourceKind};
//!
//! let client = GcpClient::builder("my-project")
//!     .build_with_default_credentials()
//!     .await?;
//! let health_checks = client.list(ResourceKind::HealthCheck).await?;
//! ```

pub mod auth;
pub mod client;
pub mod types;

pub use client::{GcpClient, GcpClientBuilder, GcpClientConfig};
