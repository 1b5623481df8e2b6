//! # Prometheus Metrics
//!
//! Exposes registry activity for the node. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] under
//! the `humanlink` namespace so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use humanlink_protocol::storage::RegistryStats;
use humanlink_protocol::{Address, CapabilityError, ProofVerifier, PublicInputs};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Successful `link` calls.
    pub links_total: IntCounter,
    /// Successful `claim` calls.
    pub claims_total: IntCounter,
    /// Commitments imported by the relayer (no-op imports excluded).
    pub imports_total: IntCounter,
    /// Rejected registry calls by operation and error kind.
    pub rejections_total: IntCounterVec,
    pub proof_verification_seconds: Histogram,
    pub verified_addresses: IntGauge,
    pub linked_commitments: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("humanlink".into()), None)?;

        let links_total = IntCounter::new("links_total", "Meta-address commitments linked")?;
        registry.register(Box::new(links_total.clone()))?;

        let claims_total = IntCounter::new("claims_total", "Successful human status claims")?;
        registry.register(Box::new(claims_total.clone()))?;

        let imports_total = IntCounter::new(
            "imports_total",
            "Home-network commitments imported by the relayer",
        )?;
        registry.register(Box::new(imports_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Rejected registry calls"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let proof_verification_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "proof_verification_seconds",
                "Time spent verifying claim proofs",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )?;
        registry.register(Box::new(proof_verification_seconds.clone()))?;

        let verified_addresses = IntGauge::new(
            "verified_addresses",
            "Derived addresses verified on this instance",
        )?;
        registry.register(Box::new(verified_addresses.clone()))?;

        let linked_commitments = IntGauge::new(
            "linked_commitments",
            "Commitments known to this instance",
        )?;
        registry.register(Box::new(linked_commitments.clone()))?;

        Ok(Self {
            registry,
            links_total,
            claims_total,
            imports_total,
            rejections_total,
            proof_verification_seconds,
            verified_addresses,
            linked_commitments,
        })
    }

    pub fn record_rejection(&self, operation: &str, reason: &str) {
        self.rejections_total
            .with_label_values(&[operation, reason])
            .inc();
    }

    /// Sync the table-size gauges with the store.
    pub fn observe_stats(&self, stats: &RegistryStats) {
        self.verified_addresses
            .set(i64::try_from(stats.verified_addresses).unwrap_or(i64::MAX));
        self.linked_commitments
            .set(i64::try_from(stats.linked_commitments).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

// ---------------------------------------------------------------------------
// Timed verifier
// ---------------------------------------------------------------------------

/// Wraps a [`ProofVerifier`] and records every call's duration.
pub struct TimedVerifier {
    inner: Arc<dyn ProofVerifier>,
    metrics: SharedMetrics,
}

impl TimedVerifier {
    pub fn new(inner: Arc<dyn ProofVerifier>, metrics: SharedMetrics) -> Self {
        Self { inner, metrics }
    }
}

impl ProofVerifier for TimedVerifier {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> Result<bool, CapabilityError> {
        let started = Instant::now();
        let result = self.inner.verify(proof, inputs);
        self.metrics
            .proof_verification_seconds
            .observe(started.elapsed().as_secs_f64());
        result
    }
}

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
