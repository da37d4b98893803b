// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! REST API for the claim queue
//!
//! Provides endpoints for:
//! - Submitting claims (optionally gated by a shared secret)
//! - Listing and fetching claims, queue statistics
//! - Health of the process, the queue and the claim store
//! - Prometheus metrics

mod handlers;
mod health;
mod middleware;
mod types;


pub use handlers::{create_api_router, MAX_BODY_BYTES};
pub use health::{SERVICE_NAME, SERVICE_VERSION};
pub use middleware::{RateDecision, RateLimitConfig, RateLimiter};
pub use types::*;

use crate::metrics::QueueMetrics;
use crate::queue::ClaimQueue;
use crate::security::WebhookSecurity;
use crate::store::ClaimStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub queue: Arc<ClaimQueue>,
    /// Store handle for connectivity checks; claim reads go through the queue
    pub store: Arc<dyn ClaimStore>,
    pub security: WebhookSecurity,
    pub metrics: QueueMetrics,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(
        queue: Arc<ClaimQueue>,
        store: Arc<dyn ClaimStore>,
        security: WebhookSecurity,
        metrics: QueueMetrics,
        rate_limit: RateLimitConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            store,
            security,
            metrics,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
            started_at: Instant::now(),
        })
    }
}
