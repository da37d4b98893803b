// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared-secret check for claim submission
//!
//! Callers may present the secret in a header, the request body or the query
//! string. The first non-empty candidate wins and is compared against the
//! configured secret in constant time.

use crate::error::{ClaimError, ClaimResult};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const WEBHOOK_SECRET_FIELD: &str = "webhook_secret";

const BEARER_PREFIX: &str = "Bearer ";

/// Where the presented secret was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    WebhookHeader,
    BearerToken,
    ApiKeyHeader,
    Body,
    Query,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub webhook_security_enabled: bool,
    pub secret_configured: bool,
    pub supported_headers: Vec<String>,
    pub supported_methods: Vec<String>,
}

#[derive(Clone)]
pub struct WebhookSecurity {
    secret: Option<String>,
}

impl std::fmt::Debug for WebhookSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecurity")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl WebhookSecurity {
    /// A blank secret disables the check
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self { secret: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    pub fn authorize(
        &self,
        headers: &HeaderMap,
        body_secret: Option<&str>,
        query_secret: Option<&str>,
    ) -> ClaimResult<()> {
        let Some(expected) = self.secret.as_deref() else {
            return Ok(());
        };

        let Some((source, presented)) = extract_secret(headers, body_secret, query_secret) else {
            warn!("[Security] Claim submission without webhook secret");
            return Err(ClaimError::Unauthorized(
                "webhook secret required".to_string(),
            ));
        };

        if !secrets_match(expected, &presented) {
            warn!("[Security] Invalid webhook secret presented via {:?}", source);
            return Err(ClaimError::Unauthorized(
                "invalid webhook secret".to_string(),
            ));
        }
        Ok(())
    }

    pub fn status(&self) -> SecurityStatus {
        SecurityStatus {
            webhook_security_enabled: self.is_enabled(),
            secret_configured: self.is_enabled(),
            supported_headers: vec![
                WEBHOOK_SECRET_HEADER.to_string(),
                "authorization (Bearer token)".to_string(),
                API_KEY_HEADER.to_string(),
            ],
            supported_methods: vec![
                "header".to_string(),
                "body".to_string(),
                "query".to_string(),
            ],
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick the first non-empty candidate in precedence order
pub fn extract_secret(
    headers: &HeaderMap,
    body_secret: Option<&str>,
    query_secret: Option<&str>,
) -> Option<(SecretSource, String)> {
    header_value(headers, WEBHOOK_SECRET_HEADER)
        .map(|s| (SecretSource::WebhookHeader, s))
        .or_else(|| bearer_token(headers).map(|s| (SecretSource::BearerToken, s)))
        .or_else(|| header_value(headers, API_KEY_HEADER).map(|s| (SecretSource::ApiKeyHeader, s)))
        .or_else(|| non_empty(body_secret).map(|s| (SecretSource::Body, s)))
        .or_else(|| non_empty(query_secret).map(|s| (SecretSource::Query, s)))
}

/// Compare by verifying HMAC tags keyed with the expected secret, so timing
/// does not depend on where the inputs differ or on their lengths.
fn secrets_match(expected: &str, presented: &str) -> bool {
    let tag = |value: &str| -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(expected.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };
    let (Some(expected_mac), Some(presented_mac)) = (tag(expected), tag(presented)) else {
        return false;
    };
    let expected_tag = expected_mac.finalize().into_bytes();
    presented_mac.verify_slice(&expected_tag).is_ok()
}
