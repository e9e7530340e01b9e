//! Frontend steps: URL map, target HTTPS proxy, global address and the
//! forwarding rule tying them together on port 443.

use tracing::warn;

use crate::config::{Config, UrlMapMode};
use crate::error::{Error, Result};
use crate::gcp::types::{
    Address, BackendService, ComputeResource, ForwardingRule, SslCertificate, TargetHttpsProxy,
    UrlMap,
};
use crate::provider::{Provider, ResourceKind};

use super::{ensure, find, link_of, Ensured, Step, StepContext, StepOutput};

/// gcloud command equivalent to the URL map create call
pub fn url_map_command(config: &Config) -> String {
    format!(
        "gcloud compute url-maps create {} --default-service {} --project={}",
        config.resource_name(ResourceKind::UrlMap),
        config.resource_name(ResourceKind::BackendService),
        config.project
    )
}

/// Ensure the URL map exists, honouring the configured [`UrlMapMode`]
pub async fn ensure_url_map<P>(
    provider: &P,
    ctx: &StepContext<'_>,
    backend_service: &BackendService,
) -> Result<Ensured<UrlMap>>
where
    P: Provider + ?Sized,
{
    let mut desired = UrlMap {
        name: ctx.config.resource_name(ResourceKind::UrlMap),
        default_service: Some(link_of(backend_service)?),
        self_link: None,
    };

    if ctx.url_map_mode == UrlMapMode::Api {
        return ensure(provider, ctx, Step::UrlMap, desired).await;
    }

    if let Some(existing) = find::<P, UrlMap>(provider, &desired.name).await? {
        let name = existing.name.clone();
        return Ok(Ensured {
            resource: existing,
            output: StepOutput::ok(Step::UrlMap, format!("url map '{}' already exists", name))
                .with_resource(name),
        });
    }

    let command = url_map_command(ctx.config);

    if ctx.check_mode {
        let name = desired.name.clone();
        desired.set_self_link(provider.resource_link(ResourceKind::UrlMap, &name));
        return Ok(Ensured {
            resource: desired,
            output: StepOutput::changed(
                Step::UrlMap,
                format!("url map '{}' must be created manually: {}", name, command),
            )
            .with_resource(name),
        });
    }

    warn!("URL map creation through the API is disabled (url_map_mode = manual)");
    Err(Error::ManualStepRequired {
        name: desired.name,
        command,
    })
}

pub async fn ensure_target_proxy<P>(
    provider: &P,
    ctx: &StepContext<'_>,
    certificate: &SslCertificate,
    url_map: &UrlMap,
) -> Result<Ensured<TargetHttpsProxy>>
where
    P: Provider + ?Sized,
{
    let desired = TargetHttpsProxy {
        name: ctx.config.resource_name(ResourceKind::TargetHttpsProxy),
        url_map: Some(link_of(url_map)?),
        ssl_certificates: vec![link_of(certificate)?],
        self_link: None,
    };
    ensure(provider, ctx, Step::TargetProxy, desired).await
}

pub async fn ensure_global_address<P>(provider: &P, ctx: &StepContext<'_>) -> Result<Ensured<Address>>
where
    P: Provider + ?Sized,
{
    let desired = Address {
        name: ctx.config.resource_name(ResourceKind::GlobalAddress),
        address: None,
        ip_version: Some("IPV4".to_string()),
        self_link: None,
    };
    ensure(provider, ctx, Step::GlobalAddress, desired).await
}

/// Ensure the HTTPS forwarding rule: TCP 443, premium tier
pub async fn ensure_forwarding_rule<P>(
    provider: &P,
    ctx: &StepContext<'_>,
    address: &Address,
    proxy: &TargetHttpsProxy,
) -> Result<Ensured<ForwardingRule>>
where
    P: Provider + ?Sized,
{
    // a planned address has no IP until it is reserved
    let ip_address = match &address.address {
        Some(ip) => Some(ip.clone()),
        None if ctx.check_mode => None,
        None => {
            return Err(Error::MissingField {
                kind: ResourceKind::GlobalAddress.to_string(),
                name: address.name.clone(),
                field: "address",
            })
        }
    };

    let desired = ForwardingRule {
        name: ctx.config.resource_name(ResourceKind::ForwardingRule),
        ip_address,
        ip_protocol: Some("TCP".to_string()),
        port_range: Some("443".to_string()),
        target: Some(link_of(proxy)?),
        network_tier: Some("PREMIUM".to_string()),
        self_link: None,
    };
    ensure(provider, ctx, Step::ForwardingRule, desired).await
}
