// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Claim processing queue
//!
//! A single-flight worker that advances at most one pending claim per cycle:
//! - Lists all claims and picks the first pending one in store order
//! - Marks it `processing` before calling the transfer gateway
//! - Records `completed` or `failed` with the processing time
//!
//! Cycles run on a fixed interval once [`ClaimQueue::start`] is called and can
//! also be triggered directly with [`ClaimQueue::process_queue`]. A cycle that
//! finds another one in flight returns immediately.
//!
//! The single-flight guard is process local. Running two instances against the
//! same store can submit a claim twice.

use crate::error::{ClaimError, ClaimResult};
use crate::gateway::TransferGateway;
use crate::metrics::QueueMetrics;
use crate::store::ClaimStore;
use crate::types::{
    Claim, ClaimCounts, ClaimStats, ClaimStatus, ListOptions, NewClaim, QueueProcessingStatus,
    QueueStats, QueueStatus, StatusUpdate,
};
use chrono::Utc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_PROCESSING_INTERVAL_MS: u64 = 15_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub processing_interval: Duration,
}

impl QueueConfig {
    pub fn from_millis(interval_ms: u64) -> ClaimResult<Self> {
        if interval_ms == 0 {
            return Err(ClaimError::Config(
                "processing interval must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            processing_interval: Duration::from_millis(interval_ms),
        })
    }

    pub fn interval_ms(&self) -> u64 {
        self.processing_interval.as_millis() as u64
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_millis(DEFAULT_PROCESSING_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum CycleState {
    Idle = 0,
    Running = 1,
}

/// What a single processing cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was already in flight
    Skipped,
    NoPendingClaims,
    Processed {
        claim_id: String,
        status: ClaimStatus,
    },
    /// The claim list could not be read
    Aborted { reason: String },
}

impl CycleOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::NoPendingClaims => "no_pending",
            CycleOutcome::Processed { .. } => "processed",
            CycleOutcome::Aborted { .. } => "aborted",
        }
    }
}

struct TimerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ClaimQueue {
    store: Arc<dyn ClaimStore>,
    gateway: Arc<dyn TransferGateway>,
    config: QueueConfig,
    metrics: QueueMetrics,
    state: AtomicU8,
    stats: Mutex<QueueStats>,
    timer: Mutex<Option<TimerHandle>>,
    idle: Notify,
}

/// Returns the queue to idle when a cycle ends, however it ends
struct CycleGuard<'a> {
    queue: &'a ClaimQueue,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.queue.lock_stats().last_processed_at = Some(Utc::now());
        self.queue
            .state
            .store(CycleState::Idle as u8, Ordering::Release);
        self.queue.metrics.cycle_in_flight.set(0);
        self.queue.idle.notify_waiters();
    }
}

impl ClaimQueue {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        gateway: Arc<dyn TransferGateway>,
        config: QueueConfig,
        metrics: QueueMetrics,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            metrics,
            state: AtomicU8::new(CycleState::Idle as u8),
            stats: Mutex::new(QueueStats::default()),
            timer: Mutex::new(None),
            idle: Notify::new(),
        }
    }

    fn lock_stats(&self) -> MutexGuard<'_, QueueStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<TimerHandle>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn is_processing(&self) -> bool {
        self.state.load(Ordering::Acquire) == CycleState::Running as u8
    }

    pub fn is_running(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .map(|timer| !timer.cancel.is_cancelled())
            .unwrap_or(false)
    }

    /// Record a new pending claim and return its id
    ///
    /// Inputs are expected to be validated by the caller.
    pub async fn add_claim(&self, new_claim: NewClaim) -> ClaimResult<String> {
        let claim = Claim {
            id: Uuid::new_v4().to_string(),
            amount: new_claim.amount,
            wallet: new_claim.wallet,
            created_at: Utc::now(),
            status: ClaimStatus::Pending,
            processed_at: None,
            error_message: None,
        };

        if let Err(e) = self.store.append(&claim).await {
            error!(
                "[ClaimQueue] Failed to append claim {} for wallet {}: {}",
                claim.id, claim.wallet, e
            );
            self.metrics
                .store_errors
                .with_label_values(&["append"])
                .inc();
            return Err(e);
        }

        self.metrics.claims_created.inc();
        info!(
            "[ClaimQueue] Claim {} queued: {} to {}",
            claim.id, claim.amount, claim.wallet
        );
        Ok(claim.id)
    }

    /// Newest first, with optional status filter and pagination
    pub async fn list_claims(&self, options: &ListOptions) -> ClaimResult<Vec<Claim>> {
        let mut claims = self.read_claims("list_claims").await?;
        if let Some(status) = options.status {
            claims.retain(|c| c.status == status);
        }
        // Stable sort keeps store order for equal timestamps
        claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(claims
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect())
    }

    pub async fn get_claim(&self, id: &str) -> ClaimResult<Option<Claim>> {
        let claims = self.read_claims("get_claim").await?;
        Ok(claims.into_iter().find(|c| c.id == id))
    }

    pub async fn get_stats(&self) -> ClaimResult<ClaimStats> {
        let claims = self.read_claims("get_stats").await?;
        Ok(ClaimStats {
            lifetime: self.lock_stats().clone(),
            queue_status: QueueProcessingStatus {
                is_processing: self.is_processing(),
                interval_ms: self.config.interval_ms(),
            },
            claim_counts: ClaimCounts::tally(&claims),
        })
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            is_running: self.is_running(),
            is_processing: self.is_processing(),
            interval_ms: self.config.interval_ms(),
            stats: self.lock_stats().clone(),
        }
    }

    async fn read_claims(&self, operation: &'static str) -> ClaimResult<Vec<Claim>> {
        self.store.list_all().await.map_err(|e| {
            error!("[ClaimQueue] {} failed to read claims: {}", operation, e);
            self.metrics
                .store_errors
                .with_label_values(&["list_all"])
                .inc();
            e
        })
    }

    /// Start the recurring timer. The first cycle runs immediately.
    ///
    /// Returns false if the timer is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut timer = self.lock_timer();
        if timer.is_some() {
            warn!("[ClaimQueue] Queue processor already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let queue = Arc::clone(self);
        let task = tokio::spawn(queue.run(cancel.clone()));
        *timer = Some(TimerHandle { cancel, task });
        info!(
            "[ClaimQueue] Started with interval: {:?}",
            self.config.processing_interval
        );
        true
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.processing_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[ClaimQueue] Timer cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.process_queue().await;
                }
            }
        }
    }

    /// Stop the timer and wait for any in-flight cycle to finish
    pub async fn stop(&self) {
        let timer = self.lock_timer().take();
        match timer {
            Some(TimerHandle { cancel, task }) => {
                cancel.cancel();
                if let Err(e) = task.await {
                    error!("[ClaimQueue] Timer task ended abnormally: {:?}", e);
                }
            }
            None => debug!("[ClaimQueue] Stop requested but timer is not running"),
        }
        self.wait_idle().await;
        info!("[ClaimQueue] Queue processor stopped");
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the two is not lost
            notified.as_mut().enable();
            if !self.is_processing() {
                return;
            }
            notified.await;
        }
    }

    /// Run one processing cycle
    pub async fn process_queue(&self) -> CycleOutcome {
        if self
            .state
            .compare_exchange(
                CycleState::Idle as u8,
                CycleState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!("[ClaimQueue] Cycle already in flight, skipping");
            self.metrics.cycles.with_label_values(&["skipped"]).inc();
            return CycleOutcome::Skipped;
        }
        self.metrics.cycle_in_flight.set(1);
        let _guard = CycleGuard { queue: self };

        let outcome = self.run_cycle().await;
        self.metrics
            .cycles
            .with_label_values(&[outcome.as_label()])
            .inc();
        outcome
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let claims = match self.read_claims("process_queue").await {
            Ok(claims) => claims,
            Err(e) => {
                return CycleOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
        };

        let Some(claim) = claims
            .into_iter()
            .find(|c| c.status == ClaimStatus::Pending)
        else {
            debug!("[ClaimQueue] No pending claims");
            return CycleOutcome::NoPendingClaims;
        };

        info!(
            "[ClaimQueue] Processing claim {}: {} to {}",
            claim.id, claim.amount, claim.wallet
        );

        if let Err(e) = self
            .store
            .update_status(&claim.id, StatusUpdate::processing())
            .await
        {
            error!(
                "[ClaimQueue] Failed to mark claim {} as processing: {}",
                claim.id, e
            );
            self.metrics
                .store_errors
                .with_label_values(&["mark_processing"])
                .inc();
            {
                let mut stats = self.lock_stats();
                stats.total_processed += 1;
                stats.total_errors += 1;
            }
            // Terminal without a gateway call
            let update = StatusUpdate::failed(Utc::now(), e.to_string());
            return self.record_result(claim.id, update).await;
        }

        let started = Instant::now();
        let outcome = self.gateway.submit(claim.amount, &claim.wallet).await;
        self.metrics
            .transfer_latency
            .observe(started.elapsed().as_secs_f64());

        let now = Utc::now();
        let update = match outcome.error_message() {
            None => {
                info!("[ClaimQueue] Claim {} completed", claim.id);
                self.metrics
                    .transfers
                    .with_label_values(&["completed"])
                    .inc();
                let mut stats = self.lock_stats();
                stats.total_processed += 1;
                stats.total_success += 1;
                StatusUpdate::completed(now)
            }
            Some(message) => {
                warn!("[ClaimQueue] Claim {} failed: {}", claim.id, message);
                self.metrics.transfers.with_label_values(&["failed"]).inc();
                let mut stats = self.lock_stats();
                stats.total_processed += 1;
                stats.total_errors += 1;
                StatusUpdate::failed(now, message)
            }
        };
        self.record_result(claim.id, update).await
    }

    async fn record_result(&self, claim_id: String, update: StatusUpdate) -> CycleOutcome {
        let status = update.status;
        if let Err(e) = self.store.update_status(&claim_id, update).await {
            error!(
                "[ClaimQueue] Failed to record {} result for claim {}: {}",
                status, claim_id, e
            );
            self.metrics
                .store_errors
                .with_label_values(&["write_result"])
                .inc();
        }
        CycleOutcome::Processed { claim_id, status }
    }
}
