//! Managed certificate step: `<service>-cert` covering the DNS entry.

use crate::error::Result;
use crate::gcp::types::{ManagedCertificate, SslCertificate};
use crate::provider::{Provider, ResourceKind};

use super::{ensure, Ensured, Step, StepContext};

pub fn desired_certificate(ctx: &StepContext<'_>) -> SslCertificate {
    SslCertificate {
        name: ctx.config.resource_name(ResourceKind::SslCertificate),
        cert_type: Some("MANAGED".to_string()),
        managed: Some(ManagedCertificate {
            domains: vec![ctx.config.dns_domain()],
            status: None,
        }),
        self_link: None,
    }
}

pub async fn ensure_certificate<P>(provider: &P, ctx: &StepContext<'_>) -> Result<Ensured<SslCertificate>>
where
    P: Provider + ?Sized,
{
    ensure(provider, ctx, Step::Certificate, desired_certificate(ctx)).await
}
