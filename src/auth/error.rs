// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! The `Display` text is meant for logs and may carry detail. Responses only
//! ever carry [`AuthError::message`], a short fixed string per failure kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::{ErrorEnvelope, CODE_SERVICE_UNAVAILABLE, CODE_UNAUTHORIZED};

/// Per-request authentication failure.
///
/// Every variant except [`AuthError::NotInitialized`] is recoverable by the
/// caller presenting a new token; none of them are retried by the gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The gate was wired without a validator.
    #[error("authentication is not initialized")]
    NotInitialized,
    /// No `Authorization: Bearer ...` header.
    #[error("missing or invalid Authorization header")]
    MissingHeader,
    /// Not a structurally valid signed JWT.
    #[error("token could not be parsed: {0}")]
    MalformedOrUnsigned(String),
    /// Signature did not verify, or the signing key is unknown.
    #[error("token signature is invalid: {0}")]
    InvalidSignature(String),
    /// Payload did not decode into the expected claim shape.
    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),
    #[error("token expiry not set")]
    ExpiryNotSet,
    #[error("token expired at {expired_at}, current time {now}")]
    Expired { expired_at: i64, now: i64 },
    #[error("token issuer '{actual}' does not match '{expected}'")]
    InvalidIssuer { actual: String, expected: String },
    #[error("token audience does not contain the configured client id")]
    InvalidAudience,
    #[error("token tenant '{actual}' does not match the configured tenant")]
    InvalidTenant { actual: String },
}

impl AuthError {
    /// Short message sent to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::NotInitialized => "Authentication service not available",
            AuthError::MissingHeader => "Missing or invalid Authorization header",
            AuthError::MalformedOrUnsigned(_) => "Failed to parse JWT token",
            AuthError::InvalidSignature(_) => "Invalid token",
            AuthError::InvalidClaims(_) => "Invalid token claims",
            AuthError::ExpiryNotSet | AuthError::Expired { .. } => "Token expired",
            AuthError::InvalidIssuer { .. } => "Invalid token issuer",
            AuthError::InvalidAudience => "Invalid token audience",
            AuthError::InvalidTenant { .. } => "Invalid tenant ID",
        }
    }

    /// Failure kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::NotInitialized => "not_initialized",
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedOrUnsigned(_) => "malformed_or_unsigned",
            AuthError::InvalidSignature(_) => "invalid_signature",
            AuthError::InvalidClaims(_) => "invalid_claims",
            AuthError::ExpiryNotSet => "expiry_not_set",
            AuthError::Expired { .. } => "expired",
            AuthError::InvalidIssuer { .. } => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::InvalidTenant { .. } => "invalid_tenant",
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotInitialized => CODE_SERVICE_UNAVAILABLE,
            _ => CODE_UNAUTHORIZED,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotInitialized => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        ErrorEnvelope::new(status, self.error_code(), self.message()).into_response_with(status)
    }
}
