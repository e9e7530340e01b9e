//! DNS step: an A record for the DNS entry pointing at the global address.
//!
//! Any existing record set with the same name, whatever its type, makes this
//! step a no-op.

use tracing::info;

use crate::error::{Error, Result};
use crate::gcp::types::{Address, Change, ResourceRecordSet};
use crate::provider::{Provider, ResourceKind};

use super::{Step, StepContext, StepOutput};

/// TTL of the created record, in seconds
pub const RECORD_TTL: u32 = 300;

/// Record set added when the DNS entry is absent
pub fn desired_record(fqdn: &str, ip: &str) -> ResourceRecordSet {
    ResourceRecordSet {
        name: fqdn.to_string(),
        record_type: "A".to_string(),
        ttl: Some(RECORD_TTL),
        rrdatas: vec![ip.to_string()],
    }
}

pub async fn ensure_dns_record<P>(provider: &P, ctx: &StepContext<'_>, address: &Address) -> Result<StepOutput>
where
    P: Provider + ?Sized,
{
    let zone = &ctx.config.dns_zone;
    let fqdn = ctx.config.dns_fqdn();

    let rrsets = provider.list_record_sets(zone).await?;
    if rrsets.iter().any(|r| r.name.eq_ignore_ascii_case(&fqdn)) {
        return Ok(
            StepOutput::ok(Step::DnsRecord, format!("record '{}' already exists in zone '{}'", fqdn, zone))
                .with_resource(fqdn),
        );
    }

    let ip = match (&address.address, ctx.check_mode) {
        (Some(ip), _) => ip.clone(),
        (None, true) => {
            return Ok(StepOutput::changed(
                Step::DnsRecord,
                format!(
                    "Would create A record '{}' (TTL {}) for the address of '{}'",
                    fqdn, RECORD_TTL, address.name
                ),
            )
            .with_resource(fqdn))
        }
        (None, false) => {
            return Err(Error::MissingField {
                kind: ResourceKind::GlobalAddress.to_string(),
                name: address.name.clone(),
                field: "address",
            })
        }
    };

    if ctx.check_mode {
        return Ok(StepOutput::changed(
            Step::DnsRecord,
            format!("Would create A record '{}' -> {} (TTL {})", fqdn, ip, RECORD_TTL),
        )
        .with_resource(fqdn));
    }

    info!("Creating A record '{}' -> {} in zone '{}'", fqdn, ip, zone);
    let change = Change {
        additions: vec![desired_record(&fqdn, &ip)],
        ..Change::default()
    };
    provider.create_change(zone, &change).await?;

    Ok(StepOutput::changed(
        Step::DnsRecord,
        format!("Created A record '{}' -> {} (TTL {})", fqdn, ip, RECORD_TTL),
    )
    .with_resource(fqdn))
}
