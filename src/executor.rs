//! Provisioning run orchestration.
//!
//! [`Provisioner`] runs every step in dependency order, feeding each step the
//! resources produced by earlier ones, and stops at the first failure. There
//! is no rollback: resources created before a failure are picked up by the
//! idempotency checks of the next run.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};

use crate::config::{Config, UrlMapMode};
use crate::error::Result;
use crate::provider::Provider;
use crate::steps::{self, Step, StepContext, StepOutput};

/// Per-run settings layered over the config
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// List but never mutate
    pub check_mode: bool,
    /// Override of the configured settle delay
    pub settle_delay: Option<Duration>,
    /// Override of the configured URL map mode
    pub url_map_mode: Option<UrlMapMode>,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub project: String,
    pub service: String,
    pub check_mode: bool,
    pub steps: Vec<StepOutput>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Number of steps that changed something
    pub fn changed(&self) -> usize {
        self.steps.iter().filter(|s| s.changed).count()
    }

    /// Number of steps that were already in the desired state
    pub fn ok(&self) -> usize {
        self.steps.len() - self.changed()
    }
}

/// Runs the provisioning steps against a provider
pub struct Provisioner<'a, P: Provider + ?Sized> {
    provider: &'a P,
    config: &'a Config,
    options: RunOptions,
}

impl<'a, P: Provider + ?Sized> Provisioner<'a, P> {
    pub fn new(provider: &'a P, config: &'a Config) -> Self {
        Self {
            provider,
            config,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    fn context(&self) -> StepContext<'a> {
        StepContext {
            config: self.config,
            check_mode: self.options.check_mode,
            settle_delay: self
                .options
                .settle_delay
                .unwrap_or(self.config.settle_delay),
            url_map_mode: self
                .options
                .url_map_mode
                .unwrap_or(self.config.url_map_mode),
        }
    }

    /// Run every step
    pub async fn run(&self) -> Result<RunReport> {
        self.run_with(|_| {}).await
    }

    /// Run every step, reporting each finished step to `on_step`
    pub async fn run_with<F>(&self, mut on_step: F) -> Result<RunReport>
    where
        F: FnMut(&StepOutput),
    {
        let span = info_span!(
            "provision",
            project = %self.config.project,
            service = %self.config.service,
            check_mode = self.options.check_mode
        );
        let started = Instant::now();
        let mut outputs = Vec::with_capacity(Step::ORDER.len());

        let result = self
            .execute(&mut |output: StepOutput| {
                on_step(&output);
                outputs.push(output);
            })
            .instrument(span)
            .await;

        if let Err(e) = result {
            error!("Provisioning stopped: {}", e);
            return Err(e);
        }

        Ok(RunReport {
            project: self.config.project.clone(),
            service: self.config.service.clone(),
            check_mode: self.options.check_mode,
            steps: outputs,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn execute(&self, record: &mut dyn FnMut(StepOutput)) -> Result<()> {
        let ctx = self.context();
        let provider = self.provider;

        let hc = steps::ensure_health_check(provider, &ctx)
            .await
            .map_err(|e| e.in_step(Step::HealthCheck))?;
        record(hc.output);

        let be = steps::ensure_backend_service(provider, &ctx, &hc.resource)
            .await
            .map_err(|e| e.in_step(Step::BackendService))?;
        record(be.output);

        let registered = steps::register_negs(provider, &ctx, &be.resource)
            .await
            .map_err(|e| e.in_step(Step::NegRegistration))?;
        record(registered.output);

        let cert = steps::ensure_certificate(provider, &ctx)
            .await
            .map_err(|e| e.in_step(Step::Certificate))?;
        record(cert.output);

        let url_map = steps::ensure_url_map(provider, &ctx, &registered.resource)
            .await
            .map_err(|e| e.in_step(Step::UrlMap))?;
        record(url_map.output);

        let proxy = steps::ensure_target_proxy(provider, &ctx, &cert.resource, &url_map.resource)
            .await
            .map_err(|e| e.in_step(Step::TargetProxy))?;
        record(proxy.output);

        let address = steps::ensure_global_address(provider, &ctx)
            .await
            .map_err(|e| e.in_step(Step::GlobalAddress))?;
        record(address.output);

        let rule = steps::ensure_forwarding_rule(provider, &ctx, &address.resource, &proxy.resource)
            .await
            .map_err(|e| e.in_step(Step::ForwardingRule))?;
        record(rule.output);

        let dns = steps::ensure_dns_record(provider, &ctx, &address.resource)
            .await
            .map_err(|e| e.in_step(Step::DnsRecord))?;
        record(dns);

        info!("Load balancer for '{}' is in place", self.config.service);
        Ok(())
    }
}
