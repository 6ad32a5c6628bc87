use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use prometheus::{IntCounterVec, Opts, Registry};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::core::AppConfig;
use crate::gateway::{ChatBackend, ChatGateway};
use crate::generators::PdfGenerator;
use crate::prompt::PromptBuilder;
use crate::templates::TemplateRegistry;

pub type KeyedRateLimiter = Arc<RateLimiter<String, DashMapStateStore<String>, DefaultClock>>;

/// Request counters exposed on `/metrics` next to the process collector.
pub struct ApiMetrics {
    pub registry: Registry,
    pub generations: IntCounterVec,
    pub exports: IntCounterVec,
}

impl ApiMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let generations = IntCounterVec::new(
            Opts::new("docgen_generation_requests_total", "Generation requests by outcome"),
            &["outcome"],
        )?;
        let exports = IntCounterVec::new(
            Opts::new("docgen_export_requests_total", "Export requests by format and outcome"),
            &["format", "outcome"],
        )?;

        registry.register(Box::new(generations.clone()))?;
        registry.register(Box::new(exports.clone()))?;

        Ok(ApiMetrics {
            registry,
            generations,
            exports,
        })
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub registry: &'static TemplateRegistry,
    pub backend: Arc<dyn ChatBackend>,
    pub prompts: Arc<PromptBuilder>,
    pub pdf: Arc<PdfGenerator>,
    pub rate_limiter: KeyedRateLimiter,
    pub metrics: Arc<ApiMetrics>,
}

impl ApiState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let gateway = ChatGateway::new(&config.gateway)?;
        if !gateway.is_configured() {
            tracing::warn!("gateway api key is not configured, generation requests will fail");
        }
        Self::with_backend(config, Arc::new(gateway))
    }

    /// Builds the state around any chat backend.
    pub fn with_backend(config: AppConfig, backend: Arc<dyn ChatBackend>) -> anyhow::Result<Self> {
        let per_minute = NonZeroU32::new(config.rate_limit.per_minute)
            .ok_or_else(|| anyhow::anyhow!("rate_limit.per_minute must be positive"))?;
        let burst = NonZeroU32::new(config.rate_limit.burst)
            .ok_or_else(|| anyhow::anyhow!("rate_limit.burst must be positive"))?;
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        let rate_limiter = Arc::new(RateLimiter::dashmap_with_clock(quota, &DefaultClock::default()));

        Ok(ApiState {
            registry: TemplateRegistry::builtin(),
            backend,
            prompts: Arc::new(PromptBuilder::new(config.gateway.model.clone())),
            pdf: Arc::new(PdfGenerator::new(&config.export)),
            rate_limiter,
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }
}
