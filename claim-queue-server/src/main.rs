// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Claim Queue Server
//!
//! ```text
//! HTTP client ──► API ──► ClaimQueue ──► ClaimStore (Google Sheets)
//!                              │
//!                        timer (interval)
//!                              │
//!                              ▼
//!                       TransferGateway
//! ```
//!
//! Claims are accepted over HTTP and stored as `pending`. A single-flight
//! timer forwards one pending claim per tick to the transfer API.

use anyhow::Context;
use clap::Parser;
use claim_queue_server::api::{create_api_router, ApiState};
use claim_queue_server::config::{LogFormat, ServerArgs, StoreBackend};
use claim_queue_server::gateway::HttpTransferGateway;
use claim_queue_server::metrics::QueueMetrics;
use claim_queue_server::queue::ClaimQueue;
use claim_queue_server::security::WebhookSecurity;
use claim_queue_server::store::{
    ClaimStore, InMemoryClaimStore, ServiceAccountAuth, SheetsClaimStore, SheetsConfig,
};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHEETS_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    let registry = Registry::new();
    let metrics = QueueMetrics::new(&registry);

    let store = init_store(&args).await?;
    let gateway = Arc::new(
        HttpTransferGateway::new(args.transfer_api_url.clone())
            .context("Failed to create transfer gateway")?,
    );
    tracing::info!("[Main] Transfer API: {}", gateway.url());

    let queue_config = args.queue_config().context("Invalid queue configuration")?;
    let queue = Arc::new(ClaimQueue::new(
        store.clone(),
        gateway,
        queue_config,
        metrics.clone(),
    ));

    let security = WebhookSecurity::new(args.webhook_secret.clone());
    if security.is_enabled() {
        tracing::info!("[Main] Webhook security enabled");
    } else {
        tracing::warn!("[Main] WEBHOOK_SECRET not set, claim submission is unauthenticated");
    }

    let rate_limit = args
        .rate_limit_config()
        .context("Invalid rate limit configuration")?;
    let api_state = ApiState::new(queue.clone(), store, security, metrics, rate_limit);

    queue.start();

    let addr = args.listen_address();
    let result = serve(addr, api_state).await;

    tracing::info!("[Main] Shutting down, waiting for in-flight claim");
    queue.stop().await;
    result
}

// ============================================================================
// Initialization Helpers
// ============================================================================

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn init_store(args: &ServerArgs) -> anyhow::Result<Arc<dyn ClaimStore>> {
    match args.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("[Main] Using in-memory claim store, claims are lost on restart");
            Ok(Arc::new(InMemoryClaimStore::new()))
        }
        StoreBackend::Sheets => {
            let sheet_id = args.sheet_id()?;
            let key = args
                .service_account_key()
                .context("Failed to load service account credentials")?;
            let client = reqwest::Client::builder()
                .timeout(SHEETS_HTTP_TIMEOUT)
                .build()
                .context("Failed to build HTTP client")?;
            let auth = ServiceAccountAuth::new(key, client.clone())?;

            let mut config = SheetsConfig::new(sheet_id.to_string());
            config.sheet_name = args.google_sheet_name.clone();
            let store = SheetsClaimStore::new(config, client, auth);
            store
                .initialize()
                .await
                .context("Failed to initialize Google Sheets store")?;
            Ok(Arc::new(store))
        }
    }
}

async fn serve(addr: SocketAddr, state: Arc<ApiState>) -> anyhow::Result<()> {
    let app = create_api_router(state).into_make_service_with_connect_info::<SocketAddr>();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("[Main] API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("API server error")
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("[Main] SIGTERM received"),
                    _ = sigint.recv() => tracing::info!("[Main] SIGINT received"),
                }
            }
            _ => {
                tracing::warn!("[Main] Failed to register signal handlers, using ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
