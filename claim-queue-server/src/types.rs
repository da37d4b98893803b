// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Claim domain types shared by the store, queue and API layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default page size for claim listings
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Claim lifecycle status
///
/// Only moves forward: pending -> processing -> completed | failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Processing => "processing",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ClaimStatus::Pending),
            "processing" => Ok(ClaimStatus::Processing),
            "completed" => Ok(ClaimStatus::Completed),
            "failed" => Ok(ClaimStatus::Failed),
            other => Err(format!("Unknown claim status: {}", other)),
        }
    }
}

/// A request to transfer `amount` to `wallet`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    pub amount: f64,
    pub wallet: String,
    pub created_at: DateTime<Utc>,
    pub status: ClaimStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Input for creating a claim. Validation happens in the API layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClaim {
    pub amount: f64,
    pub wallet: String,
}

/// Fields the store is allowed to mutate on an existing claim
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: ClaimStatus,
    /// `None` leaves the stored value untouched
    pub processed_at: Option<DateTime<Utc>>,
    /// `None` clears any stored message
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn processing() -> Self {
        Self {
            status: ClaimStatus::Processing,
            processed_at: None,
            error_message: None,
        }
    }

    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: ClaimStatus::Completed,
            processed_at: Some(at),
            error_message: None,
        }
    }

    pub fn failed(at: DateTime<Utc>, message: String) -> Self {
        Self {
            status: ClaimStatus::Failed,
            processed_at: Some(at),
            error_message: Some(message),
        }
    }
}

/// Filtering and pagination for claim listings
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub status: Option<ClaimStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

/// Lifetime counters kept by the queue
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total_processed: u64,
    pub total_success: u64,
    pub total_errors: u64,
    pub last_processed_at: Option<DateTime<Utc>>,
}

/// Live tally of claims per status, recomputed from the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClaimCounts {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl ClaimCounts {
    pub fn tally<'a>(claims: impl IntoIterator<Item = &'a Claim>) -> Self {
        let mut counts = Self::default();
        for claim in claims {
            counts.total += 1;
            match claim.status {
                ClaimStatus::Pending => counts.pending += 1,
                ClaimStatus::Processing => counts.processing += 1,
                ClaimStatus::Completed => counts.completed += 1,
                ClaimStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueProcessingStatus {
    pub is_processing: bool,
    pub interval_ms: u64,
}

/// Response body of the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStats {
    #[serde(flatten)]
    pub lifetime: QueueStats,
    pub queue_status: QueueProcessingStatus,
    pub claim_counts: ClaimCounts,
}

/// Queue runtime state, reported by the queue health endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub is_running: bool,
    pub is_processing: bool,
    pub interval_ms: u64,
    pub stats: QueueStats,
}

/// Connectivity report for the claim store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreHealth {
    pub connected: bool,
    pub backend: String,
    pub title: Option<String>,
    pub checked_at: DateTime<Utc>,
}
