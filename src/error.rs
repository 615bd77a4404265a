// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service and HTTP error types.
//!
//! Services return [`ServiceResult`]; handlers convert a [`ServiceError`]
//! into an [`ApiError`], which renders as `application/problem+json`.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::StoreError;

/// Title used for failures reported by the services.
pub const SERVICE_ERROR_TITLE: &str = "An error occurred.";

/// Title used for failures caught at the outer boundary.
pub const UNEXPECTED_ERROR_TITLE: &str = "An unexpected error occurred.";

pub const PROBLEM_JSON: &str = "application/problem+json";

/// Non-standard status for a request the client abandoned.
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
}

/// Failure of a service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    /// The caller's cancellation token fired before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    /// Store failure with no service-level meaning; mapped at the boundary.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => ServiceError::Cancelled,
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// RFC 7807 problem details body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub extensions: ProblemExtensions,
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemExtensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// HTTP-facing error.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub title: &'static str,
    pub message: String,
    pub instance: Option<String>,
    pub request_id: Option<String>,
    pub trace_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            title: SERVICE_ERROR_TITLE,
            message: message.into(),
            instance: None,
            request_id: None,
            trace_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Fixed status/detail pair for a failure that escaped the services.
    fn unexpected(status: StatusCode, message: &str) -> Self {
        Self {
            title: UNEXPECTED_ERROR_TITLE,
            ..Self::new(status, message)
        }
    }

    pub fn with_title(mut self, title: &'static str) -> Self {
        self.title = title;
        self
    }

    /// Attach the request coordinates reported in the problem body.
    pub fn at(
        mut self,
        instance: impl Into<String>,
        request_id: Option<String>,
        trace_id: Option<String>,
    ) -> Self {
        self.instance = Some(instance.into());
        self.request_id = request_id;
        self.trace_id = trace_id;
        self
    }

    pub fn to_problem(&self) -> ProblemDetails {
        ProblemDetails {
            type_uri: format!("https://httpstatuses.com/{}", self.status.as_u16()),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.message.clone(),
            instance: self.instance.clone(),
            extensions: ProblemExtensions {
                request_id: self.request_id.clone(),
                trace_id: self.trace_id.clone(),
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Unhandled store failure");

        match err {
            StoreError::UniqueViolation(_) => {
                Self::unexpected(StatusCode::CONFLICT, "Resource already exists")
            }
            StoreError::RedbCommit(_) | StoreError::MissingReference(_) => {
                Self::unexpected(StatusCode::CONFLICT, "Database update error")
            }
            StoreError::Timeout(_) => Self::unexpected(StatusCode::GATEWAY_TIMEOUT, "Timeout"),
            StoreError::Cancelled => Self::unexpected(client_closed_request(), "Request canceled"),
            StoreError::RedbDatabase(_)
            | StoreError::RedbTransaction(_)
            | StoreError::RedbStorage(_) => {
                Self::unexpected(StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable")
            }
            _ => Self::unexpected(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error"),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BadRequest(msg) => Self::bad_request(msg),
            ServiceError::Unauthorized(msg) => Self::unauthorized(msg),
            ServiceError::Forbidden(msg) => Self::forbidden(msg),
            ServiceError::NotFound(msg) => Self::not_found(msg),
            ServiceError::Conflict(msg) => Self::conflict(msg),
            ServiceError::Internal(msg) => Self::internal(msg),
            ServiceError::Cancelled => {
                Self::unexpected(client_closed_request(), "Request canceled")
            }
            ServiceError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut response = (status, Json(self.to_problem())).into_response();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.title, SERVICE_ERROR_TITLE);

        let conflict = ApiError::conflict("dup");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[test]
    fn service_errors_map_one_to_one() {
        let cases = [
            (ServiceError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
            assert_eq!(api.message, "x");
        }
    }

    #[test]
    fn cancellation_is_not_an_internal_error() {
        let from_service: ApiError = ServiceError::Cancelled.into();
        assert_eq!(from_service.status.as_u16(), 499);
        assert_eq!(from_service.message, "Request canceled");

        let converted: ServiceError = StoreError::Cancelled.into();
        assert!(matches!(converted, ServiceError::Cancelled));
    }

    #[test]
    fn store_failures_map_to_fixed_pairs() {
        let dup: ApiError = StoreError::UniqueViolation("users_by_email").into();
        assert_eq!(dup.status, StatusCode::CONFLICT);
        assert_eq!(dup.message, "Resource already exists");
        assert_eq!(dup.title, UNEXPECTED_ERROR_TITLE);

        let slow: ApiError = StoreError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(slow.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(slow.message, "Timeout");

        let other: ApiError = StoreError::NotFound("user 4".into()).into();
        assert_eq!(other.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.message, "Unexpected error");
    }

    #[tokio::test]
    async fn into_response_returns_problem_json() {
        let response = ApiError::bad_request("bad data")
            .at("POST /cards", Some("req-1".into()), None)
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], PROBLEM_JSON);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["type"], "https://httpstatuses.com/400");
        assert_eq!(body["title"], SERVICE_ERROR_TITLE);
        assert_eq!(body["status"], 400);
        assert_eq!(body["detail"], "bad data");
        assert_eq!(body["instance"], "POST /cards");
        assert_eq!(body["extensions"]["requestId"], "req-1");
        assert!(body["extensions"].get("traceId").is_none());
    }
}
