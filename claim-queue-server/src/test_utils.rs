// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the claim store and transfer gateway.

use crate::error::{ClaimError, ClaimResult};
use crate::gateway::{TransferGateway, TransferOutcome};
use crate::store::{ClaimStore, InMemoryClaimStore};
use crate::types::{Claim, ClaimStatus, StatusUpdate, StoreHealth};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn pending_claim_at(id: &str, created_at: DateTime<Utc>) -> Claim {
    Claim {
        id: id.to_string(),
        amount: 10.0,
        wallet: format!("wallet-{}", id),
        created_at,
        status: ClaimStatus::Pending,
        processed_at: None,
        error_message: None,
    }
}

// Scripted gateway. Outcomes are returned in order, then every call succeeds.
#[derive(Debug, Default)]
pub struct MockTransferGateway {
    outcomes: Mutex<VecDeque<TransferOutcome>>,
    calls: Mutex<Vec<(f64, String)>>,
    // When set, submit blocks until `release` is called
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl MockTransferGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: Vec<TransferOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Default::default()
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(f64, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until a submit call is in progress
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl TransferGateway for MockTransferGateway {
    async fn submit(&self, amount: f64, wallet: &str) -> TransferOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((amount, wallet.to_string()));
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TransferOutcome::Completed { status_code: 200 })
    }
}

// In-memory store whose operations can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyClaimStore {
    inner: InMemoryClaimStore,
    fail_append: AtomicBool,
    fail_list: AtomicBool,
    fail_connection: AtomicBool,
    fail_updates: AtomicBool,
    fail_update_to: Mutex<Option<ClaimStatus>>,
}

impl FlakyClaimStore {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self {
            inner: InMemoryClaimStore::with_claims(claims),
            ..Default::default()
        }
    }

    pub fn fail_append(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connection(&self, fail: bool) {
        self.fail_connection.store(fail, Ordering::SeqCst);
    }

    /// Fail every status update
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Fail updates that move a claim to `status`
    pub fn fail_update_to(&self, status: Option<ClaimStatus>) {
        *self.fail_update_to.lock().unwrap() = status;
    }

    fn unavailable(op: &str) -> ClaimError {
        ClaimError::StoreUnavailable(format!("{} failed: backend offline", op))
    }
}

#[async_trait]
impl ClaimStore for FlakyClaimStore {
    async fn append(&self, claim: &Claim) -> ClaimResult<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(Self::unavailable("append"));
        }
        self.inner.append(claim).await
    }

    async fn list_all(&self) -> ClaimResult<Vec<Claim>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::unavailable("list"));
        }
        self.inner.list_all().await
    }

    async fn update_status(&self, id: &str, update: StatusUpdate) -> ClaimResult<()> {
        let fail_to = *self.fail_update_to.lock().unwrap();
        if self.fail_updates.load(Ordering::SeqCst) || fail_to == Some(update.status) {
            return Err(Self::unavailable("update"));
        }
        self.inner.update_status(id, update).await
    }

    async fn check_connection(&self) -> ClaimResult<StoreHealth> {
        if self.fail_connection.load(Ordering::SeqCst) {
            return Err(Self::unavailable("connection check"));
        }
        self.inner.check_connection().await
    }
}
