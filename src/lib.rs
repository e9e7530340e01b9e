//! # neglb - HTTPS load balancers for network endpoint groups
//!
//! neglb provisions a Google Cloud external HTTPS load balancer in front of a
//! service's network endpoint groups (NEGs). Every run is idempotent: each
//! resource is looked up by its deterministic name before it is created, so
//! re-running after a failure or a partial setup only fills in what is
//! missing.
//!
//! ## Resources
//!
//! For a service `shop` a run ensures, in order:
//!
//! | Step | Resource |
//! |------|----------|
//! | health check | `shop-hc` (HTTP) |
//! | backend service | `shop-be` |
//! | neg registration | every NEG whose name contains `shop-80` |
//! | certificate | `shop-cert` (Google-managed) |
//! | url map | `shop-um` |
//! | target proxy | `shop-tp` (HTTPS) |
//! | global address | `shop-ip` |
//! | forwarding rule | `shop-fw` (TCP 443) |
//! | dns record | A record for the configured DNS entry |
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CLI (clap, colored output)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          Provisioner (executor): steps in sequence          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Provider trait ── GcpClient (Compute + DNS REST)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use neglb::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load("config.json")?;
//!     let client = GcpClient::builder_for(&config)
//!         .build_with_default_credentials()
//!         .await?;
//!
//!     let report = Provisioner::new(&client, &config).run().await?;
//!     println!("{} step(s) changed", report.changed());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::{Config, UrlMapMode};
    pub use crate::error::{Error, Result};
    pub use crate::executor::{Provisioner, RunOptions, RunReport};
    pub use crate::gcp::GcpClient;
    pub use crate::provider::{Provider, ResourceKind};
    pub use crate::steps::{Step, StepOutput, StepStatus};
}

/// Error types and result aliases.
pub mod error;

/// Configuration loading and validation.
pub mod config;

/// The cloud provider seam used by every step.
pub mod provider;

/// Google Cloud REST client, authentication and wire types.
pub mod gcp;

/// Individual ensure-or-create steps.
pub mod steps;

/// Orchestration of a full provisioning run.
pub mod executor;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
