// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder,
};

const TRANSFER_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0, 7.5, 10., 15., 20., 25., 30.,
];

#[derive(Clone, Debug)]
pub struct QueueMetrics {
    pub(crate) claims_created: IntCounter,
    pub(crate) cycles: IntCounterVec,
    pub(crate) transfers: IntCounterVec,
    pub(crate) transfer_latency: Histogram,
    pub(crate) store_errors: IntCounterVec,
    pub(crate) cycle_in_flight: IntGauge,
    pub(crate) rate_limited_requests: IntCounter,
    registry: Registry,
}

impl QueueMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            claims_created: register_int_counter_with_registry!(
                "claim_queue_claims_created",
                "Total number of claims accepted by the API",
                registry,
            )
            .unwrap(),
            cycles: register_int_counter_vec_with_registry!(
                "claim_queue_cycles",
                "Total number of processing cycles, by outcome",
                &["outcome"],
                registry,
            )
            .unwrap(),
            transfers: register_int_counter_vec_with_registry!(
                "claim_queue_transfers",
                "Total number of transfer gateway calls, by result",
                &["result"],
                registry,
            )
            .unwrap(),
            transfer_latency: register_histogram_with_registry!(
                "claim_queue_transfer_latency",
                "Latency of transfer gateway calls in seconds",
                TRANSFER_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            store_errors: register_int_counter_vec_with_registry!(
                "claim_queue_store_errors",
                "Total number of claim store failures, by operation",
                &["operation"],
                registry,
            )
            .unwrap(),
            cycle_in_flight: register_int_gauge_with_registry!(
                "claim_queue_cycle_in_flight",
                "1 while a processing cycle is running",
                registry,
            )
            .unwrap(),
            rate_limited_requests: register_int_counter_with_registry!(
                "claim_queue_rate_limited_requests",
                "Total number of HTTP requests rejected by the rate limiter",
                registry,
            )
            .unwrap(),
            registry: registry.clone(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }

    /// Render every metric in the registry in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {:?}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_construction() {
        let metrics = QueueMetrics::new_for_testing();
        metrics.claims_created.inc();
        metrics.cycles.with_label_values(&["skipped"]).inc();
        metrics.transfers.with_label_values(&["completed"]).inc();
        metrics.store_errors.with_label_values(&["list_all"]).inc();
        assert_eq!(metrics.claims_created.get(), 1);
        assert_eq!(metrics.cycles.with_label_values(&["skipped"]).get(), 1);
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        let metrics = QueueMetrics::new_for_testing();
        metrics.claims_created.inc();
        metrics.transfer_latency.observe(0.3);

        let text = metrics.render();
        assert!(text.contains("claim_queue_claims_created 1"));
        assert!(text.contains("claim_queue_transfer_latency_bucket"));
    }
}
