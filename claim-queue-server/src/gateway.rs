// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transfer gateway client
//!
//! Forwards a claim to the third-party transfer API. Every call ends in a
//! [`TransferOutcome`]; transport errors and timeouts are failures, not errors.

use crate::error::{ClaimError, ClaimResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TRANSFER_API_URL: &str = "https://token-transfer-claim.vercel.app/transfer";

/// Upper bound for a single transfer request
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("claim-queue-server/", env!("CARGO_PKG_VERSION"));

/// Result of one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed {
        status_code: u16,
    },
    Failed {
        message: String,
        /// Upstream HTTP status, absent for transport errors and timeouts
        status_code: Option<u16>,
    },
}

impl TransferOutcome {
    /// Message recorded on a failed claim
    pub fn error_message(&self) -> Option<String> {
        match self {
            TransferOutcome::Completed { .. } => None,
            TransferOutcome::Failed {
                message,
                status_code: Some(code),
            } => Some(format!("API Error {}: {}", code, message)),
            TransferOutcome::Failed {
                message,
                status_code: None,
            } => Some(message.clone()),
        }
    }
}

#[async_trait]
pub trait TransferGateway: Send + Sync {
    async fn submit(&self, amount: f64, wallet: &str) -> TransferOutcome;
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    message: Option<String>,
}

/// HTTP implementation posting `{amount, walletAddress}` to the transfer API
pub struct HttpTransferGateway {
    client: Client,
    url: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransferGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransferGateway")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransferGateway {
    pub fn new(url: String) -> ClaimResult<Self> {
        Self::with_timeout(url, TRANSFER_TIMEOUT)
    }

    pub fn with_timeout(url: String, timeout: Duration) -> ClaimResult<Self> {
        reqwest::Url::parse(&url)
            .map_err(|e| ClaimError::Config(format!("Invalid transfer API URL {}: {}", url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClaimError::Gateway(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransferGateway for HttpTransferGateway {
    async fn submit(&self, amount: f64, wallet: &str) -> TransferOutcome {
        let result = self
            .client
            .post(&self.url)
            .json(&json!({
                "amount": amount,
                "walletAddress": wallet,
            }))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Transfer request timed out after {:?}", self.timeout)
                } else {
                    format!("Transfer request failed: {}", e)
                };
                warn!("[Gateway] {}", message);
                return TransferOutcome::Failed {
                    message,
                    status_code: None,
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            info!("[Gateway] Transfer accepted with status {}", status);
            return TransferOutcome::Completed {
                status_code: status.as_u16(),
            };
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GatewayErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        warn!("[Gateway] Transfer rejected with {}: {}", status, message);

        TransferOutcome::Failed {
            message,
            status_code: Some(status.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;

    async fn spawn_transfer_api(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    #[test]
    fn test_error_message_with_status_code() {
        let outcome = TransferOutcome::Failed {
            message: "insufficient funds".to_string(),
            status_code: Some(400),
        };
        assert_eq!(
            outcome.error_message().unwrap(),
            "API Error 400: insufficient funds"
        );
    }

    #[test]
    fn test_error_message_without_status_code() {
        let outcome = TransferOutcome::Failed {
            message: "connection refused".to_string(),
            status_code: None,
        };
        assert_eq!(outcome.error_message().unwrap(), "connection refused");
        assert_eq!(
            TransferOutcome::Completed { status_code: 200 }.error_message(),
            None
        );
    }

    #[test]
    fn test_rejects_invalid_url() {
        assert!(matches!(
            HttpTransferGateway::new("not a url".to_string()),
            Err(ClaimError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_sends_wallet_address_field() {
        let router = Router::new().route(
            "/transfer",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body["walletAddress"] == "0xabc" && body["amount"] == 12.5 {
                    StatusCode::OK
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            }),
        );
        let addr = spawn_transfer_api(router).await;
        let gateway = HttpTransferGateway::new(format!("http://{}/transfer", addr)).unwrap();

        let outcome = gateway.submit(12.5, "0xabc").await;
        assert_eq!(outcome, TransferOutcome::Completed { status_code: 200 });
    }

    #[tokio::test]
    async fn test_submit_reports_upstream_message() {
        let router = Router::new().route(
            "/transfer",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(serde_json::json!({ "message": "wallet locked" })),
                )
            }),
        );
        let addr = spawn_transfer_api(router).await;
        let gateway = HttpTransferGateway::new(format!("http://{}/transfer", addr)).unwrap();

        let outcome = gateway.submit(1.0, "0xabc").await;
        assert_eq!(
            outcome.error_message().unwrap(),
            "API Error 502: wallet locked"
        );
    }

    #[tokio::test]
    async fn test_submit_timeout_is_failure() {
        let router = Router::new().route(
            "/transfer",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let addr = spawn_transfer_api(router).await;
        let gateway = HttpTransferGateway::with_timeout(
            format!("http://{}/transfer", addr),
            Duration::from_millis(100),
        )
        .unwrap();

        match gateway.submit(1.0, "0xabc").await {
            TransferOutcome::Failed {
                message,
                status_code,
            } => {
                assert!(message.contains("timed out"));
                assert_eq!(status_code, None);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
