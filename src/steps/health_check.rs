//! Health check step: `<service>-hc`, an HTTP probe on the service port.

use crate::error::Result;
use crate::gcp::types::{HealthCheck, HttpHealthCheck};
use crate::provider::{Provider, ResourceKind};

use super::{ensure, Ensured, Step, StepContext};

/// Descriptor created when the health check is absent
pub fn desired_health_check(ctx: &StepContext<'_>) -> HealthCheck {
    let config = ctx.config;
    HealthCheck {
        name: config.resource_name(ResourceKind::HealthCheck),
        check_type: Some("HTTP".to_string()),
        http_health_check: Some(HttpHealthCheck {
            request_path: Some(config.health_check_path.clone()),
            port: Some(config.port),
        }),
        self_link: None,
    }
}

/// Ensure the service's health check exists
pub async fn ensure_health_check<P>(provider: &P, ctx: &StepContext<'_>) -> Result<Ensured<HealthCheck>>
where
    P: Provider + ?Sized,
{
    ensure(provider, ctx, Step::HealthCheck, desired_health_check(ctx)).await
}
