// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gate for protected routes.
//!
//! Every request under the gate must carry `Authorization: Bearer <token>`.
//! The token is validated by [`TokenValidator`]; on success a
//! [`SecurityContext`] is attached to the request and the inner handler runs.
//! On failure the handler never runs and the caller gets the error envelope.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/users/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(auth_state, require_auth));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::context::SecurityContext;
use super::error::AuthError;
use super::validator::TokenValidator;

const BEARER_PREFIX: &str = "Bearer ";

/// State handed to [`require_auth`].
///
/// `validator` is `None` when the server runs without identity provider
/// settings; every gated request then fails with 500.
#[derive(Clone, Default)]
pub struct AuthState {
    pub validator: Option<Arc<TokenValidator>>,
}

impl AuthState {
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self {
            validator: Some(validator),
        }
    }

    pub fn uninitialized() -> Self {
        Self::default()
    }
}

/// Authentication middleware.
pub async fn require_auth(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = client_ip(&request);

    match authenticate(&auth, request).await {
        Ok(request) => next.run(request).await,
        Err(e) => {
            warn!(
                client_ip = %client_ip,
                reason = e.kind(),
                error = %e,
                "{}",
                e.message()
            );
            e.into_response()
        }
    }
}

async fn authenticate(auth: &AuthState, request: Request) -> Result<Request, AuthError> {
    let validator = auth.validator.as_ref().ok_or(AuthError::NotInitialized)?;

    let raw = extract_bearer_token(request.headers())?.to_string();
    let claims = validator.validate(&raw).await?;

    info!(
        tenant_id = %claims.tenant_id(),
        user_id = %claims.subject_id(),
        user_name = %claims.display_name(),
        "User authenticated"
    );

    let context = SecurityContext::new(
        claims.tenant_id(),
        claims.subject_id(),
        claims.display_name(),
        raw,
    );
    Ok(context.attach(request))
}

/// Raw token after the exact `Bearer ` prefix. The remainder is not trimmed.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::MissingHeader)
}

/// Caller address for logging: first `X-Forwarded-For` hop, else the peer address.
fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claims_with, sign, valid_claims, validator, KEY_A, TENANT};
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderValue, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(auth: AuthState, reached: Arc<AtomicBool>) -> Router {
        Router::new()
            .route(
                "/protected",
                get(move |ctx: SecurityContext| {
                    let reached = reached.clone();
                    async move {
                        reached.store(true, Ordering::SeqCst);
                        Json(json!({
                            "tenant_id": ctx.tenant_id().ok(),
                            "user_id": ctx.user_id().ok(),
                            "user_name": ctx.user_name().ok(),
                            "access_token": ctx.access_token().ok(),
                        }))
                    }
                }),
            )
            .layer(axum::middleware::from_fn_with_state(auth, require_auth))
    }

    async fn call(auth: AuthState, authorization: Option<&str>) -> (StatusCode, Value, bool) {
        let reached = Arc::new(AtomicBool::new(false));
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app(auth, reached.clone())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body, reached.load(Ordering::SeqCst))
    }

    fn gate() -> AuthState {
        AuthState::new(Arc::new(validator()))
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_context() {
        let token = sign(&KEY_A, &valid_claims());
        let (status, body, reached) = call(gate(), Some(format!("Bearer {token}").as_str())).await;

        assert_eq!(status, StatusCode::OK);
        assert!(reached);
        assert_eq!(body["tenant_id"], TENANT);
        assert_eq!(body["user_id"], "user-1");
        assert_eq!(body["user_name"], "Ada Lovelace");
        assert_eq!(body["access_token"], token.as_str());
    }

    #[tokio::test]
    async fn uninitialized_gate_returns_500() {
        let (status, body, reached) = call(AuthState::uninitialized(), Some("Bearer x")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(body["message"], "Authentication service not available");
        assert!(!reached);
    }

    #[tokio::test]
    async fn missing_or_wrong_scheme_is_rejected() {
        for header in [None, Some(""), Some("Basic dXNlcjpwYXNz"), Some("bearer abc"), Some("Bearer")] {
            let (status, body, reached) = call(gate(), header).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{header:?}");
            assert_eq!(body["message"], "Missing or invalid Authorization header");
            assert!(!reached);
        }
    }

    #[tokio::test]
    async fn token_after_prefix_is_not_trimmed() {
        let token = sign(&KEY_A, &valid_claims());
        let (status, body, reached) = call(gate(), Some(format!("Bearer  {token}").as_str())).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Failed to parse JWT token");
        assert!(!reached);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (status, body, reached) = call(gate(), Some("Bearer not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Failed to parse JWT token");
        assert!(!reached);
    }

    #[tokio::test]
    async fn claim_failures_map_to_their_messages() {
        let cases = [
            (claims_with("exp", json!(chrono::Utc::now().timestamp() - 1)), "Token expired"),
            (claims_with("exp", Value::Null), "Token expired"),
            (claims_with("iss", json!("https://sts.windows.net/tenant-2/")), "Invalid token issuer"),
            (claims_with("aud", json!(["other"])), "Invalid token audience"),
            (claims_with("tid", json!("tenant-2")), "Invalid tenant ID"),
        ];

        for (claims, message) in cases {
            let token = sign(&KEY_A, &claims);
            let (status, body, reached) = call(gate(), Some(format!("Bearer {token}").as_str())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{message}");
            assert_eq!(body["message"], message);
            assert_eq!(body["code"], "UNAUTHORIZED");
            assert_eq!(body["status_code"], 401);
            assert!(!reached, "{message}");
        }
    }

    #[test]
    fn bearer_prefix_is_exact() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Ok("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc"));
        assert_eq!(extract_bearer_token(&headers), Ok(" abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(extract_bearer_token(&headers), Err(AuthError::MissingHeader));
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let mut request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_ip(&request), "203.0.113.7");

        request.headers_mut().remove("x-forwarded-for");
        assert_eq!(client_ip(&request), "192.0.2.1");

        let bare = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare), "unknown");
    }
}
