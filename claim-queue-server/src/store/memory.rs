// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::ClaimStore;
use crate::error::{ClaimError, ClaimResult};
use crate::types::{Claim, StatusUpdate, StoreHealth};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

/// Claim store kept in process memory, insertion ordered
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    claims: RwLock<Vec<Claim>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with claims, kept in the given order
    pub fn with_claims(claims: Vec<Claim>) -> Self {
        Self {
            claims: RwLock::new(claims),
        }
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn append(&self, claim: &Claim) -> ClaimResult<()> {
        self.claims.write().await.push(claim.clone());
        debug!("[MemoryStore] Appended claim {}", claim.id);
        Ok(())
    }

    async fn list_all(&self) -> ClaimResult<Vec<Claim>> {
        Ok(self.claims.read().await.clone())
    }

    async fn update_status(&self, id: &str, update: StatusUpdate) -> ClaimResult<()> {
        let mut claims = self.claims.write().await;
        let claim = claims
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ClaimError::ClaimNotFound(id.to_string()))?;

        claim.status = update.status;
        if let Some(at) = update.processed_at {
            claim.processed_at = Some(at);
        }
        claim.error_message = update.error_message;
        debug!("[MemoryStore] Claim {} -> {}", id, claim.status);
        Ok(())
    }

    async fn check_connection(&self) -> ClaimResult<StoreHealth> {
        Ok(StoreHealth {
            connected: true,
            backend: "memory".to_string(),
            title: None,
            checked_at: Utc::now(),
        })
    }
}
