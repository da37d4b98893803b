// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Claim store backends
//!
//! The queue only talks to the [`ClaimStore`] trait. Two backends exist:
//! - [`SheetsClaimStore`]: Google Sheets table (production)
//! - [`InMemoryClaimStore`]: process-local vector (development and tests)
//!
//! Neither backend provides locking. Running more than one server instance
//! against the same table can process a claim twice.

mod auth;
mod memory;
mod sheets;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, DEFAULT_TOKEN_URI, SHEETS_SCOPE};
pub use memory::InMemoryClaimStore;
pub use sheets::{SheetsClaimStore, SheetsConfig, CLAIM_HEADERS, DEFAULT_SHEET_NAME};

use crate::error::ClaimResult;
use crate::types::{Claim, StatusUpdate, StoreHealth};
use async_trait::async_trait;

#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Persist a new claim with all of its fields
    async fn append(&self, claim: &Claim) -> ClaimResult<()>;

    /// Return every claim in insertion order
    ///
    /// The queue processes the first pending claim of this list, so backends
    /// must not reorder rows.
    async fn list_all(&self) -> ClaimResult<Vec<Claim>>;

    /// Mutate status, processed_at and error_message of one claim
    async fn update_status(&self, id: &str, update: StatusUpdate) -> ClaimResult<()>;

    /// Probe connectivity for health checks
    async fn check_connection(&self) -> ClaimResult<StoreHealth>;
}
