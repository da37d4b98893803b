// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Server configuration
//!
//! Every flag can also be set through the environment variable of the same
//! name in upper snake case, e.g. `--processing-interval` / `PROCESSING_INTERVAL`.

use crate::api::RateLimitConfig;
use crate::error::{ClaimError, ClaimResult};
use crate::gateway::DEFAULT_TRANSFER_API_URL;
use crate::queue::QueueConfig;
use crate::store::{ServiceAccountKey, DEFAULT_SHEET_NAME};
use clap::{Parser, ValueEnum};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_KEY_PATH: &str = "./credentials/service-account-key.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Sheets,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug, Clone)]
#[clap(rename_all = "kebab-case", author, version, about = "Claim queue server")]
pub struct ServerArgs {
    #[clap(env, long, default_value = "3000")]
    pub port: u16,
    /// Milliseconds between processing cycles
    #[clap(env, long, default_value = "15000")]
    pub processing_interval: u64,
    #[clap(env, long, default_value = DEFAULT_TRANSFER_API_URL)]
    pub transfer_api_url: String,
    /// Shared secret required to submit claims; unset disables the check
    #[clap(env, long, hide_env_values = true)]
    pub webhook_secret: Option<String>,

    // Claim store
    #[clap(env, long, value_enum, default_value = "sheets")]
    pub store_backend: StoreBackend,
    #[clap(env, long)]
    pub google_sheet_id: Option<String>,
    #[clap(env, long, default_value = DEFAULT_SHEET_NAME)]
    pub google_sheet_name: String,

    // Service account credentials, tried in this order
    /// Full service account key JSON
    #[clap(env, long, hide_env_values = true)]
    pub google_service_account_key: Option<String>,
    #[clap(env, long)]
    pub google_service_account_client_email: Option<String>,
    #[clap(env, long, hide_env_values = true)]
    pub google_service_account_private_key: Option<String>,
    #[clap(env, long)]
    pub google_service_account_private_key_id: Option<String>,
    #[clap(env, long)]
    pub google_service_account_token_uri: Option<String>,
    #[clap(env, long, default_value = DEFAULT_KEY_PATH)]
    pub google_service_account_key_path: PathBuf,

    // HTTP middleware
    #[clap(env, long, default_value = "900000")]
    pub rate_limit_window_ms: u64,
    #[clap(env, long, default_value = "100")]
    pub rate_limit_max_requests: u32,
    /// Key the rate limiter on `x-forwarded-for`; enable only behind a trusted proxy
    #[clap(env, long)]
    pub trust_forwarded_for: bool,

    #[clap(env, long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ServerArgs {
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn queue_config(&self) -> ClaimResult<QueueConfig> {
        QueueConfig::from_millis(self.processing_interval)
    }

    pub fn rate_limit_config(&self) -> ClaimResult<RateLimitConfig> {
        if self.rate_limit_window_ms == 0 {
            return Err(ClaimError::Config(
                "rate limit window must be greater than 0".to_string(),
            ));
        }
        Ok(RateLimitConfig {
            window: Duration::from_millis(self.rate_limit_window_ms),
            max_requests: self.rate_limit_max_requests,
            trust_forwarded_for: self.trust_forwarded_for,
        })
    }

    pub fn sheet_id(&self) -> ClaimResult<&str> {
        non_blank(&self.google_sheet_id).ok_or_else(|| {
            ClaimError::Config("GOOGLE_SHEET_ID is required for the sheets backend".to_string())
        })
    }

    /// Resolve credentials: JSON blob, then discrete fields, then key file
    pub fn service_account_key(&self) -> ClaimResult<ServiceAccountKey> {
        if let Some(json) = non_blank(&self.google_service_account_key) {
            info!("[Config] Using service account key from GOOGLE_SERVICE_ACCOUNT_KEY");
            return ServiceAccountKey::from_json(json);
        }

        if let (Some(email), Some(private_key)) = (
            non_blank(&self.google_service_account_client_email),
            non_blank(&self.google_service_account_private_key),
        ) {
            info!("[Config] Using service account key from discrete environment fields");
            return Ok(ServiceAccountKey::from_fields(
                email.to_string(),
                private_key,
                non_blank(&self.google_service_account_private_key_id).map(str::to_string),
                non_blank(&self.google_service_account_token_uri).map(str::to_string),
            ));
        }

        let path = &self.google_service_account_key_path;
        if path.exists() {
            info!("[Config] Using service account key file {:?}", path);
            return ServiceAccountKey::from_file(path);
        }

        Err(ClaimError::Config(format!(
            "No service account credentials: set GOOGLE_SERVICE_ACCOUNT_KEY, \
             GOOGLE_SERVICE_ACCOUNT_CLIENT_EMAIL and GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY, \
             or provide a key file at {:?}",
            path
        )))
    }
}
