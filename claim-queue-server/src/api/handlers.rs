// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Claim endpoints and router assembly

use crate::api::health::{health_check, queue_health, root_info, store_health};
use crate::api::middleware::{cors_middleware, rate_limit_middleware, security_headers_middleware};
use crate::api::types::*;
use crate::api::ApiState;
use crate::error::ClaimError;
use crate::types::{ClaimStatus, ListOptions, NewClaim, DEFAULT_LIST_LIMIT};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Maximum accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(root_info))
        .route("/metrics", get(metrics))
        .route("/api/claims", get(list_claims).post(create_claim))
        .route("/api/claims/stats", get(claim_stats))
        .route("/api/claims/security", get(security_status))
        .route("/api/claims/:id", get(get_claim))
        .route("/api/health", get(health_check))
        .route("/api/health/queue", get(queue_health))
        .route("/api/health/sheets", get(store_health))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn(cors_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Validate a submitted claim body
fn parse_new_claim(body: &Value) -> Result<NewClaim, ApiErrorResponse> {
    let amount = body.get("amount").filter(|v| !v.is_null());
    let wallet = body.get("wallet").filter(|v| !v.is_null());
    let (Some(amount), Some(wallet)) = (amount, wallet) else {
        return Err(ApiErrorResponse::missing_fields(
            "amount and wallet are required",
            &["amount", "wallet"],
        ));
    };

    let amount = amount
        .as_f64()
        .filter(|a| a.is_finite() && *a > 0.0)
        .ok_or_else(|| ApiErrorResponse::validation("amount must be a positive number"))?;

    let wallet = wallet
        .as_str()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or_else(|| ApiErrorResponse::validation("wallet must be a non-empty string"))?;

    Ok(NewClaim {
        amount,
        wallet: wallet.to_string(),
    })
}

fn parse_list_options(query: &ClaimListQuery) -> Result<ListOptions, ApiErrorResponse> {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    let status = non_empty(&query.status)
        .map(|s| s.parse::<ClaimStatus>())
        .transpose()
        .map_err(|e| ApiErrorResponse::bad_request(&e))?;

    let limit = match non_empty(&query.limit) {
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|l| *l > 0)
            .ok_or_else(|| {
                ApiErrorResponse::bad_request(&format!(
                    "limit must be a positive integer, got {}",
                    raw
                ))
            })?,
        None => DEFAULT_LIST_LIMIT,
    };

    let offset = match non_empty(&query.offset) {
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            ApiErrorResponse::bad_request(&format!(
                "offset must be a non-negative integer, got {}",
                raw
            ))
        })?,
        None => 0,
    };

    Ok(ListOptions {
        status,
        limit,
        offset,
    })
}

/// Submit a new claim. Gated by the shared secret when one is configured.
async fn create_claim(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateClaimResponse>), ApiErrorResponse> {
    let body: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiErrorResponse::bad_request(&format!("Invalid JSON body: {}", e)))?
    };

    let body_secret = body.get(crate::security::WEBHOOK_SECRET_FIELD).and_then(Value::as_str);
    state
        .security
        .authorize(&headers, body_secret, query.webhook_secret.as_deref())?;

    let new_claim = parse_new_claim(&body)?;
    let amount = new_claim.amount;
    let wallet = new_claim.wallet.clone();

    let claim_id = state
        .queue
        .add_claim(new_claim)
        .await
        .map_err(|e| ApiErrorResponse::from_claim_error(e, "Failed to process claim"))?;

    info!("[API] Claim {} accepted", claim_id);
    Ok((
        StatusCode::CREATED,
        Json(CreateClaimResponse {
            success: true,
            message: "Claim added to queue".to_string(),
            claim_id,
            data: CreatedClaimData {
                amount,
                wallet,
                status: ClaimStatus::Pending,
            },
        }),
    ))
}

async fn list_claims(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ClaimListQuery>,
) -> Result<Json<ClaimListResponse>, ApiErrorResponse> {
    let options = parse_list_options(&query)?;
    let claims = state
        .queue
        .list_claims(&options)
        .await
        .map_err(|e| ApiErrorResponse::from_claim_error(e, "Failed to fetch claims"))?;

    Ok(Json(ClaimListResponse {
        success: true,
        pagination: Pagination {
            limit: options.limit,
            offset: options.offset,
            count: claims.len(),
        },
        data: claims,
    }))
}

async fn get_claim(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiErrorResponse> {
    let claim = state
        .queue
        .get_claim(&id)
        .await
        .map_err(|e| ApiErrorResponse::from_claim_error(e, "Failed to fetch claim"))?
        .ok_or_else(|| ApiErrorResponse::from(ClaimError::ClaimNotFound(id)))?;
    Ok(Json(DataResponse::ok(claim)).into_response())
}

async fn claim_stats(State(state): State<Arc<ApiState>>) -> Result<Response, ApiErrorResponse> {
    let stats = state
        .queue
        .get_stats()
        .await
        .map_err(|e| ApiErrorResponse::from_claim_error(e, "Failed to fetch statistics"))?;
    Ok(Json(DataResponse::ok(stats)).into_response())
}

async fn security_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(DataResponse::ok(state.security.status()))
}

async fn metrics(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        state.metrics.render(),
    )
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Endpoint not found".to_string(),
            path,
        }),
    )
}

/// API error response wrapper
#[derive(Debug)]
pub(crate) struct ApiErrorResponse {
    status: StatusCode,
    body: Json<ApiError>,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error: &str, message: &str) -> Self {
        Self {
            status,
            body: Json(ApiError {
                success: false,
                error: error.to_string(),
                message: message.to_string(),
                required: None,
            }),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn validation(message: &str) -> Self {
        Self::from(ClaimError::Validation(message.to_string()))
    }

    fn missing_fields(message: &str, fields: &[&str]) -> Self {
        let mut err = Self::validation(message);
        err.body.0.required = Some(fields.iter().map(|f| f.to_string()).collect());
        err
    }

    fn internal(message: &str) -> Self {
        error!("Internal error: {}", message);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Map a domain error; server-side failures only expose `context`
    fn from_claim_error(err: ClaimError, context: &str) -> Self {
        match err {
            ClaimError::StoreUnavailable(_) | ClaimError::Gateway(_) | ClaimError::Config(_) => {
                error!("[API] {}: {}", context, err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", context)
            }
            other => Self::from(other),
        }
    }
}

impl From<ClaimError> for ApiErrorResponse {
    fn from(err: ClaimError) -> Self {
        let status = match &err {
            ClaimError::Validation(_) => StatusCode::BAD_REQUEST,
            ClaimError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ClaimError::ClaimNotFound(_) => StatusCode::NOT_FOUND,
            ClaimError::StoreUnavailable(_) | ClaimError::Gateway(_) | ClaimError::Config(_) => {
                error!("[API] {}", err);
                return Self::internal("Internal server error");
            }
        };
        let message = match &err {
            ClaimError::Validation(message) => message.clone(),
            ClaimError::Unauthorized(message) => {
                warn!("[API] Rejected claim submission: {}", message);
                message.clone()
            }
            other => other.to_string(),
        };
        Self::new(status, err.kind(), &message)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_response_bad_request() {
        let err = ApiErrorResponse::bad_request("Test error message");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.0.error, "bad_request");
        assert_eq!(err.body.0.message, "Test error message");
        assert!(!err.body.0.success);
    }

    #[test]
    fn test_api_error_response_from_claim_errors() {
        let err = ApiErrorResponse::from(ClaimError::ClaimNotFound("abc".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.0.error, "not_found");
        assert_eq!(err.body.0.message, "Claim abc not found");

        let err = ApiErrorResponse::from(ClaimError::Unauthorized("nope".to_string()));
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body.0.error, "unauthorized");
        assert_eq!(err.body.0.message, "nope");

        let err = ApiErrorResponse::from(ClaimError::Gateway("dns failure".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.0.error, "internal_error");
        assert_eq!(err.body.0.message, "Internal server error");

        let err = ApiErrorResponse::from_claim_error(
            ClaimError::StoreUnavailable("token expired for svc@example.com".to_string()),
            "Failed to fetch claims",
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.0.error, "internal_error");
        assert_eq!(err.body.0.message, "Failed to fetch claims");
    }

    #[test]
    fn test_parse_new_claim_accepts_valid_body() {
        let claim = parse_new_claim(&json!({"amount": 2.5, "wallet": "  0xabc "})).unwrap();
        assert_eq!(claim.amount, 2.5);
        assert_eq!(claim.wallet, "0xabc");
    }

    #[test]
    fn test_parse_new_claim_missing_fields() {
        let err = parse_new_claim(&json!({"amount": 1})).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.body.0.required,
            Some(vec!["amount".to_string(), "wallet".to_string()])
        );
        assert!(parse_new_claim(&json!({"amount": null, "wallet": "0x1"})).is_err());
    }

    #[test]
    fn test_parse_new_claim_rejects_invalid_values() {
        for body in [
            json!({"amount": 0, "wallet": "0xabc"}),
            json!({"amount": -3, "wallet": "0xabc"}),
            json!({"amount": "10", "wallet": "0xabc"}),
            json!({"amount": 1, "wallet": "   "}),
            json!({"amount": 1, "wallet": 42}),
        ] {
            let err = parse_new_claim(&body).unwrap_err();
            assert_eq!(err.body.0.error, "validation_error", "body: {}", body);
        }
    }

    #[test]
    fn test_parse_list_options() {
        let options = parse_list_options(&ClaimListQuery::default()).unwrap();
        assert_eq!(options, ListOptions::default());

        let options = parse_list_options(&ClaimListQuery {
            status: Some("Failed".to_string()),
            limit: Some("5".to_string()),
            offset: Some("10".to_string()),
        })
        .unwrap();
        assert_eq!(options.status, Some(ClaimStatus::Failed));
        assert_eq!(options.limit, 5);
        assert_eq!(options.offset, 10);
    }

    #[test]
    fn test_parse_list_options_rejects_bad_values() {
        for query in [
            ClaimListQuery {
                status: Some("done".to_string()),
                ..Default::default()
            },
            ClaimListQuery {
                limit: Some("0".to_string()),
                ..Default::default()
            },
            ClaimListQuery {
                limit: Some("ten".to_string()),
                ..Default::default()
            },
            ClaimListQuery {
                offset: Some("-1".to_string()),
                ..Default::default()
            },
        ] {
            let err = parse_list_options(&query).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }
}
