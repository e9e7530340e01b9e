//! Backend service step and NEG registration.
//!
//! The backend service is ensured like any other resource. NEG registration
//! is different: it always recomputes the backend list from the NEGs that
//! currently exist and overwrites the service's backends with it.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gcp::types::{Backend, BackendService, HealthCheck, NetworkEndpointGroup};
use crate::provider::{Provider, ResourceKind};

use super::{ensure, link_of, Ensured, Step, StepContext, StepOutput};

/// Balancing mode used for every NEG backend
pub const BALANCING_MODE: &str = "RATE";

/// Descriptor created when the backend service is absent
pub fn desired_backend_service(ctx: &StepContext<'_>, health_check: &HealthCheck) -> Result<BackendService> {
    Ok(BackendService {
        name: ctx.config.resource_name(ResourceKind::BackendService),
        health_checks: vec![link_of(health_check)?],
        port: Some(ctx.config.port),
        ..BackendService::default()
    })
}

/// Ensure the service's backend service exists
pub async fn ensure_backend_service<P>(
    provider: &P,
    ctx: &StepContext<'_>,
    health_check: &HealthCheck,
) -> Result<Ensured<BackendService>>
where
    P: Provider + ?Sized,
{
    let desired = desired_backend_service(ctx, health_check)?;
    ensure(provider, ctx, Step::BackendService, desired).await
}

/// Backends for every NEG whose name contains `pattern`
pub fn backends_from_negs(negs: &[NetworkEndpointGroup], pattern: &str, max_rate: u32) -> Vec<Backend> {
    negs.iter()
        .filter(|neg| neg.name.contains(pattern))
        .map(|neg| Backend {
            group: neg.self_link.clone(),
            balancing_mode: Some(BALANCING_MODE.to_string()),
            max_rate: Some(max_rate),
        })
        .collect()
}

/// Replace the backend service's backends with the service's NEGs
pub async fn register_negs<P>(
    provider: &P,
    ctx: &StepContext<'_>,
    backend_service: &BackendService,
) -> Result<Ensured<BackendService>>
where
    P: Provider + ?Sized,
{
    let negs = provider.list_network_endpoint_groups().await?;
    let pattern = ctx.config.neg_pattern();
    let backends = backends_from_negs(&negs, &pattern, ctx.config.max_rate);
    debug!(
        "{} of {} NEG(s) match '{}'",
        backends.len(),
        negs.len(),
        pattern
    );

    if backends.is_empty() {
        warn!("No NEGs matching '{}' found; backend list will be emptied", pattern);
    }

    let mut updated = backend_service.clone();
    updated.backends = backends;
    let count = updated.backends.len();

    if ctx.check_mode {
        return Ok(Ensured {
            resource: updated,
            output: StepOutput::changed(
                Step::NegRegistration,
                format!(
                    "Would register {} NEG(s) with backend service '{}'",
                    count, backend_service.name
                ),
            )
            .with_resource(&backend_service.name),
        });
    }

    info!("Registering {} NEG(s) with '{}'", count, backend_service.name);
    let body = serde_json::to_value(&updated).map_err(|e| {
        Error::decode(
            format!("{} '{}' request body", ResourceKind::BackendService, updated.name),
            e,
        )
    })?;
    provider
        .update(ResourceKind::BackendService, &backend_service.name, body)
        .await?;

    Ok(Ensured {
        output: StepOutput::changed(
            Step::NegRegistration,
            format!(
                "Registered {} NEG(s) with backend service '{}'",
                count, backend_service.name
            ),
        )
        .with_resource(&updated.name),
        resource: updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neg(name: &str) -> NetworkEndpointGroup {
        NetworkEndpointGroup {
            name: name.to_string(),
            self_link: format!("https://compute/zones/a/networkEndpointGroups/{}", name),
            ..Default::default()
        }
    }

    #[test]
    fn test_backends_from_negs_filters_by_pattern() {
        let negs = vec![
            neg("k8s1-abc-default-shop-80-1a2b"),
            neg("k8s1-abc-default-shop-8080-9f9f"),
            neg("k8s1-abc-default-shopping-80-ffff"),
            neg("k8s1-abc-default-cart-80-1234"),
            neg("k8s1-abc-default-shop-443-beef"),
        ];

        let backends = backends_from_negs(&negs, "shop-80", 9999);
        let groups: Vec<_> = backends.iter().map(|b| b.group.as_str()).collect();

        // plain substring match: "shop-8080" contains "shop-80"
        assert_eq!(
            groups,
            vec![
                "https://compute/zones/a/networkEndpointGroups/k8s1-abc-default-shop-80-1a2b",
                "https://compute/zones/a/networkEndpointGroups/k8s1-abc-default-shop-8080-9f9f",
            ]
        );
        assert!(backends
            .iter()
            .all(|b| b.balancing_mode.as_deref() == Some("RATE") && b.max_rate == Some(9999)));
    }

    #[test]
    fn test_backends_from_negs_empty() {
        assert!(backends_from_negs(&[], "shop-80", 1).is_empty());
    }

    #[test]
    fn test_desired_backend_service_requires_health_check_link() {
        let config = crate::config::Config {
            service: "shop".into(),
            ..Default::default()
        };
        let ctx = StepContext::new(&config);
        let hc = HealthCheck {
            name: "shop-hc".into(),
            ..Default::default()
        };
        assert!(desired_backend_service(&ctx, &hc).is_err());

        let hc = HealthCheck {
            self_link: Some("link/shop-hc".into()),
            ..hc
        };
        let be = desired_backend_service(&ctx, &hc).unwrap();
        assert_eq!(be.name, "shop-be");
        assert_eq!(be.health_checks, vec!["link/shop-hc".to_string()]);
        assert_eq!(be.port, Some(8080));
    }
}
