// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Explicit per-request context.
//!
//! Built once by the authentication middleware and passed by reference to
//! every service call. It carries the request coordinates used in problem
//! bodies, the raw `Authorization` header, the resolved [`CurrentUser`] and
//! the request's cancellation token.

use axum::http::{
    header::AUTHORIZATION,
    request::Parts,
    HeaderMap, Method,
};
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, CurrentUser};
use crate::error::{ApiError, ServiceError, ServiceResult};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACEPARENT_HEADER: &str = "traceparent";

#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub request_id: Option<String>,
    pub trace_id: Option<String>,
    authorization: Option<String>,
    user: CurrentUser,
    auth_error: Option<AuthError>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            request_id: None,
            trace_id: None,
            authorization: None,
            user: CurrentUser::default(),
            auth_error: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Capture method, path and tracing headers from an incoming request.
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;
        let mut ctx = Self::new(parts.method.clone(), parts.uri.path());
        ctx.request_id = header_str(headers, REQUEST_ID_HEADER).map(str::to_string);
        ctx.trace_id = header_str(headers, TRACEPARENT_HEADER).and_then(trace_id_from_traceparent);
        ctx.authorization = header_str(headers, AUTHORIZATION.as_str()).map(str::to_string);
        ctx.user = CurrentUser::anonymous(ctx.request_id.clone());
        ctx
    }

    pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.user = user;
        self
    }

    pub fn with_auth_error(mut self, err: AuthError) -> Self {
        self.auth_error = Some(err);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    /// Why the presented bearer token was rejected, if it was.
    pub fn auth_error(&self) -> Option<&AuthError> {
        self.auth_error.as_ref()
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Token part of a `Bearer` authorization header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with `Cancelled` once the request has been abandoned.
    pub fn ensure_active(&self) -> ServiceResult<()> {
        if self.cancel.is_cancelled() {
            Err(ServiceError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// `"{METHOD} {path}"`, the problem-details `instance`.
    pub fn instance(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Convert an error into a problem response located at this request.
    pub fn problem(&self, err: impl Into<ApiError>) -> ApiError {
        err.into()
            .at(self.instance(), self.request_id.clone(), self.trace_id.clone())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Trace id segment of a W3C `traceparent` header.
fn trace_id_from_traceparent(value: &str) -> Option<String> {
    let mut segments = value.split('-');
    let _version = segments.next()?;
    let trace_id = segments.next()?;
    (trace_id.len() == 32 && trace_id.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| trace_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn captures_request_coordinates() {
        let parts = parts(
            Request::builder()
                .method("DELETE")
                .uri("/cards/3?x=1")
                .header(REQUEST_ID_HEADER, "req-42")
                .header(
                    TRACEPARENT_HEADER,
                    "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                )
                .header("Authorization", "Bearer abc.def.ghi"),
        );
        let ctx = RequestContext::from_parts(&parts);

        assert_eq!(ctx.instance(), "DELETE /cards/3");
        assert_eq!(ctx.request_id.as_deref(), Some("req-42"));
        assert_eq!(
            ctx.trace_id.as_deref(),
            Some("4bf92f3577b34da6a3ce929d0e0e4736")
        );
        assert_eq!(ctx.bearer_token(), Some("abc.def.ghi"));
        assert!(!ctx.user().is_authenticated());
    }

    #[test]
    fn non_bearer_header_has_no_token() {
        let ctx = RequestContext::new(Method::POST, "/auth/logout").with_authorization("Basic Zm9v");
        assert_eq!(ctx.bearer_token(), None);
        assert_eq!(ctx.authorization(), Some("Basic Zm9v"));
    }

    #[test]
    fn malformed_traceparent_is_ignored() {
        assert_eq!(trace_id_from_traceparent("garbage"), None);
        assert_eq!(trace_id_from_traceparent("00-xyz-01"), None);
    }

    #[test]
    fn problem_carries_instance_and_ids() {
        let mut ctx = RequestContext::new(Method::GET, "/cards/9");
        ctx.request_id = Some("req-7".into());

        let err = ctx.problem(ServiceError::NotFound("Card not found.".into()));
        let body = err.to_problem();
        assert_eq!(body.instance.as_deref(), Some("GET /cards/9"));
        assert_eq!(body.extensions.request_id.as_deref(), Some("req-7"));
        assert_eq!(body.status, 404);
    }

    #[test]
    fn cancelled_context_is_inactive() {
        let cancel = CancellationToken::new();
        let ctx = RequestContext::new(Method::GET, "/").with_cancel(cancel.clone());
        assert!(ctx.ensure_active().is_ok());

        cancel.cancel();
        assert!(matches!(ctx.ensure_active(), Err(ServiceError::Cancelled)));
    }
}
