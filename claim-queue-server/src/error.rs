// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimError {
    // Request body or query failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    // Shared secret missing or wrong
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // No claim with this id exists in the store
    #[error("Claim {0} not found")]
    ClaimNotFound(String),

    // Transport, auth or decoding failure talking to the claim store
    #[error("Claim store unavailable: {0}")]
    StoreUnavailable(String),

    // The transfer gateway could not be reached or configured
    #[error("Transfer gateway error: {0}")]
    Gateway(String),

    // Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClaimError {
    /// Short machine readable kind, used as the `error` field of API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::Validation(_) => "validation_error",
            ClaimError::Unauthorized(_) => "unauthorized",
            ClaimError::ClaimNotFound(_) => "not_found",
            ClaimError::StoreUnavailable(_) => "store_unavailable",
            ClaimError::Gateway(_) => "gateway_error",
            ClaimError::Config(_) => "config_error",
        }
    }
}

impl From<reqwest::Error> for ClaimError {
    fn from(err: reqwest::Error) -> Self {
        ClaimError::StoreUnavailable(err.to_string())
    }
}

pub type ClaimResult<T> = std::result::Result<T, ClaimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ClaimError::Validation("x".into()).kind(),
            "validation_error"
        );
        assert_eq!(ClaimError::ClaimNotFound("id".into()).kind(), "not_found");
        assert_eq!(
            ClaimError::StoreUnavailable("down".into()).kind(),
            "store_unavailable"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ClaimError::ClaimNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Claim abc not found");
    }
}
