// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::api::types::*;
use crate::api::ApiState;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

pub const SERVICE_NAME: &str = "Queue Claims Server";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

const HEALTHY: &str = "healthy";
const UNHEALTHY: &str = "unhealthy";

pub(crate) async fn root_info() -> Json<RootResponse> {
    Json(RootResponse {
        name: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
        status: "running".to_string(),
        timestamp: Utc::now(),
    })
}

pub(crate) async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HEALTHY.to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        memory: MemoryUsage {
            resident_bytes: resident_memory_bytes(),
        },
        version: SERVICE_VERSION.to_string(),
    })
}

pub(crate) async fn queue_health(State(state): State<Arc<ApiState>>) -> Json<QueueHealthResponse> {
    Json(QueueHealthResponse {
        status: HEALTHY.to_string(),
        queue: state.queue.status(),
        timestamp: Utc::now(),
    })
}

pub(crate) async fn store_health(
    State(state): State<Arc<ApiState>>,
) -> (StatusCode, Json<StoreHealthResponse>) {
    match state.store.check_connection().await {
        Ok(health) => (
            StatusCode::OK,
            Json(StoreHealthResponse {
                status: HEALTHY.to_string(),
                sheets: Some(health),
                error: None,
                timestamp: Utc::now(),
            }),
        ),
        Err(e) => {
            error!("[API] Store health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StoreHealthResponse {
                    status: UNHEALTHY.to_string(),
                    sheets: None,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                }),
            )
        }
    }
}

/// Resident set size from procfs; `None` where it is unavailable
fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tclaim\nVmPeak:\t  2000 kB\nVmRSS:\t  1234 kB\nThreads:\t4\n";
        assert_eq!(parse_vm_rss(status), Some(1234 * 1024));
        assert_eq!(parse_vm_rss("Name:\tclaim\n"), None);
    }
}
