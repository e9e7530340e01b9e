//! Provisioning steps.
//!
//! Each step ensures one part of the load-balancer stack exists. Most steps
//! follow the same ensure-or-create contract, implemented once in [`ensure`]:
//!
//! 1. List the collection and look for `<service>-<suffix>`
//! 2. If present, return it unchanged (`ok`)
//! 3. Otherwise insert the desired descriptor, wait the settle delay, and read
//!    the resource back so provider-assigned fields are available (`changed`)
//!
//! In check mode step 3 is replaced by a synthesized descriptor carrying the
//! self link the resource would get.

pub mod backend;
pub mod cert;
pub mod dns;
pub mod frontend;
pub mod health_check;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{Config, UrlMapMode};
use crate::error::{Error, Result};
use crate::gcp::types::ComputeResource;
use crate::provider::Provider;

pub use backend::{backends_from_negs, ensure_backend_service, register_negs};
pub use cert::ensure_certificate;
pub use dns::ensure_dns_record;
pub use frontend::{ensure_forwarding_rule, ensure_global_address, ensure_target_proxy, ensure_url_map};
pub use health_check::ensure_health_check;

/// One step of a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    HealthCheck,
    BackendService,
    NegRegistration,
    Certificate,
    UrlMap,
    TargetProxy,
    GlobalAddress,
    ForwardingRule,
    DnsRecord,
}

impl Step {
    /// Execution order of a full run
    pub const ORDER: [Step; 9] = [
        Step::HealthCheck,
        Step::BackendService,
        Step::NegRegistration,
        Step::Certificate,
        Step::UrlMap,
        Step::TargetProxy,
        Step::GlobalAddress,
        Step::ForwardingRule,
        Step::DnsRecord,
    ];

    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::HealthCheck => "health check",
            Step::BackendService => "backend service",
            Step::NegRegistration => "neg registration",
            Step::Certificate => "certificate",
            Step::UrlMap => "url map",
            Step::TargetProxy => "target proxy",
            Step::GlobalAddress => "global address",
            Step::ForwardingRule => "forwarding rule",
            Step::DnsRecord => "dns record",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Already in the desired state
    Ok,
    /// Created or updated (or would be, in check mode)
    Changed,
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    /// Which step produced this
    pub step: Step,
    /// Whether the step changed anything
    pub changed: bool,
    /// Status of the step
    pub status: StepStatus,
    /// Human-readable message about what happened
    pub msg: String,
    /// Name of the resource the step manages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl StepOutput {
    /// Create an output for a step that changed nothing
    pub fn ok(step: Step, msg: impl Into<String>) -> Self {
        Self {
            step,
            changed: false,
            status: StepStatus::Ok,
            msg: msg.into(),
            resource: None,
        }
    }

    /// Create an output for a step that made a change
    pub fn changed(step: Step, msg: impl Into<String>) -> Self {
        Self {
            step,
            changed: true,
            status: StepStatus::Changed,
            msg: msg.into(),
            resource: None,
        }
    }

    /// Attach the managed resource's name
    pub fn with_resource(mut self, name: impl Into<String>) -> Self {
        self.resource = Some(name.into());
        self
    }
}

/// Settings shared by every step of a run
#[derive(Debug, Clone)]
pub struct StepContext<'a> {
    /// Validated configuration
    pub config: &'a Config,
    /// List but never mutate
    pub check_mode: bool,
    /// Delay after each create call
    pub settle_delay: Duration,
    /// URL map creation policy
    pub url_map_mode: UrlMapMode,
}

impl<'a> StepContext<'a> {
    /// Context taking every setting from the config
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            check_mode: false,
            settle_delay: config.settle_delay,
            url_map_mode: config.url_map_mode,
        }
    }
}

/// A resource a step ensured, with the step's outcome
#[derive(Debug, Clone)]
pub struct Ensured<R> {
    pub resource: R,
    pub output: StepOutput,
}

/// Find a resource by exact name in its collection
pub async fn find<P, R>(provider: &P, name: &str) -> Result<Option<R>>
where
    P: Provider + ?Sized,
    R: ComputeResource,
{
    let items = provider.list(R::KIND).await?;
    debug!("Found {} {}", items.len(), R::KIND);

    for item in items {
        if item.get("name").and_then(|n| n.as_str()) == Some(name) {
            let resource = serde_json::from_value(item)
                .map_err(|e| Error::decode(format!("{} '{}'", R::KIND, name), e))?;
            return Ok(Some(resource));
        }
    }

    Ok(None)
}

/// Return the existing resource named like `desired`, or create it
pub async fn ensure<P, R>(
    provider: &P,
    ctx: &StepContext<'_>,
    step: Step,
    desired: R,
) -> Result<Ensured<R>>
where
    P: Provider + ?Sized,
    R: ComputeResource,
{
    let name = desired.name().to_string();

    if let Some(existing) = find::<P, R>(provider, &name).await? {
        debug!("{} '{}' already exists", step, name);
        return Ok(Ensured {
            resource: existing,
            output: StepOutput::ok(step, format!("{} '{}' already exists", step, name))
                .with_resource(name),
        });
    }

    info!("{} '{}' not present, creating", step, name);
    create(provider, ctx, step, desired).await
}

/// Insert `desired`, wait, and read it back
pub async fn create<P, R>(
    provider: &P,
    ctx: &StepContext<'_>,
    step: Step,
    mut desired: R,
) -> Result<Ensured<R>>
where
    P: Provider + ?Sized,
    R: ComputeResource,
{
    let name = desired.name().to_string();

    if ctx.check_mode {
        desired.set_self_link(provider.resource_link(R::KIND, &name));
        return Ok(Ensured {
            resource: desired,
            output: StepOutput::changed(step, format!("Would create {} '{}'", step, name))
                .with_resource(name),
        });
    }

    let body = serde_json::to_value(&desired)
        .map_err(|e| Error::decode(format!("{} '{}' request body", R::KIND, name), e))?;
    provider.insert(R::KIND, body).await?;

    settle(ctx).await;

    let raw = provider.get(R::KIND, &name).await?;
    let resource = serde_json::from_value(raw)
        .map_err(|e| Error::decode(format!("{} '{}'", R::KIND, name), e))?;

    Ok(Ensured {
        resource,
        output: StepOutput::changed(step, format!("Created {} '{}'", step, name))
            .with_resource(name),
    })
}

/// Blind sleep after a create call
async fn settle(ctx: &StepContext<'_>) {
    if ctx.settle_delay.is_zero() {
        return;
    }
    info!(
        "Waiting {:?} for the API to catch up with the new resource",
        ctx.settle_delay
    );
    tokio::time::sleep(ctx.settle_delay).await;
}

/// Self link of a resource a later step depends on
pub(crate) fn link_of<R: ComputeResource>(resource: &R) -> Result<String> {
    resource
        .self_link()
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField {
            kind: R::KIND.to_string(),
            name: resource.name().to_string(),
            field: "selfLink",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_covers_every_step_once() {
        let mut seen = std::collections::HashSet::new();
        for step in Step::ORDER {
            assert!(seen.insert(step));
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(Step::ORDER[0], Step::HealthCheck);
        assert_eq!(Step::ORDER[8], Step::DnsRecord);
    }

    #[test]
    fn test_step_output_constructors() {
        let ok = StepOutput::ok(Step::UrlMap, "exists").with_resource("shop-um");
        assert!(!ok.changed);
        assert_eq!(ok.status, StepStatus::Ok);
        assert_eq!(ok.resource.as_deref(), Some("shop-um"));

        let changed = StepOutput::changed(Step::UrlMap, "created");
        assert!(changed.changed);
        assert_eq!(changed.status, StepStatus::Changed);
    }

    #[test]
    fn test_link_of_missing() {
        let hc = crate::gcp::types::HealthCheck {
            name: "shop-hc".into(),
            ..Default::default()
        };
        let err = link_of(&hc).unwrap_err();
        assert!(err.to_string().contains("selfLink"));
    }
}
