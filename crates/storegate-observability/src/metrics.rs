//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for Storegate:
//! - Tenant routing decisions by outcome
//! - Time spent resolving a request to a store
//! - Workflow rollbacks and the fate of each compensating delete

use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for Storegate
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Routing decisions, labelled by decision
    pub route_decisions_total: CounterVec,
    /// Duration of tenant resolution, directory lookup included
    pub store_lookup_duration_seconds: Histogram,
    /// Rollbacks started, labelled by workflow
    pub rollbacks_total: CounterVec,
    /// Compensating deletes, labelled by outcome
    pub rollback_deletes_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let route_decisions_total = CounterVec::new(
            Opts::new(
                "storegate_route_decisions_total",
                "Tenant routing decisions by outcome",
            ),
            &["decision"],
        )?;

        let store_lookup_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "storegate_store_lookup_duration_seconds",
                "Time spent resolving a request to a store",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;

        let rollbacks_total = CounterVec::new(
            Opts::new(
                "storegate_rollbacks_total",
                "Workflow rollbacks started",
            ),
            &["workflow"],
        )?;

        let rollback_deletes_total = CounterVec::new(
            Opts::new(
                "storegate_rollback_deletes_total",
                "Compensating deletes by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(route_decisions_total.clone()))?;
        registry.register(Box::new(store_lookup_duration_seconds.clone()))?;
        registry.register(Box::new(rollbacks_total.clone()))?;
        registry.register(Box::new(rollback_deletes_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            route_decisions_total,
            store_lookup_duration_seconds,
            rollbacks_total,
            rollback_deletes_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    /// Record one routing decision and how long it took
    pub fn record_route_decision(&self, decision: &str, duration_secs: f64) {
        self.route_decisions_total
            .with_label_values(&[decision])
            .inc();
        self.store_lookup_duration_seconds.observe(duration_secs);
    }

    /// Record a finished rollback sweep
    pub fn record_rollback(
        &self,
        workflow: &str,
        deleted: usize,
        already_gone: usize,
        failed: usize,
    ) {
        self.rollbacks_total.with_label_values(&[workflow]).inc();
        for (outcome, count) in [
            ("deleted", deleted),
            ("already_gone", already_gone),
            ("failed", failed),
        ] {
            if count > 0 {
                self.rollback_deletes_total
                    .with_label_values(&[outcome])
                    .inc_by(count as f64);
            }
        }
    }
}
