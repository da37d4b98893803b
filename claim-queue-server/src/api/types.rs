// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Request and response bodies of the REST API

use crate::types::{Claim, ClaimStatus, QueueStatus, StoreHealth};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API error response
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub message: String,
    /// Names of the fields a request must carry, on missing-field errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// Generic `{success, data}` envelope
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedClaimData {
    pub amount: f64,
    pub wallet: String,
    pub status: ClaimStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClaimResponse {
    pub success: bool,
    pub message: String,
    pub claim_id: String,
    pub data: CreatedClaimData,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimListResponse {
    pub success: bool,
    pub data: Vec<Claim>,
    pub pagination: Pagination,
}

/// Query parameters for the list endpoint, validated by the handler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimListQuery {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Query parameters accepted on claim submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitQuery {
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// Resident set size, when the platform exposes it
    pub resident_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub memory: MemoryUsage,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueHealthResponse {
    pub status: String,
    pub queue: QueueStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreHealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets: Option<StoreHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotFoundResponse {
    pub error: String,
    pub path: String,
}
