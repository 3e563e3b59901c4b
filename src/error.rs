// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const CODE_UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const CODE_SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
pub const CODE_FAILED_DEPENDENCY: &str = "FAILED_DEPENDENCY";

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    /// Always `"error"`.
    pub status: &'static str,
    /// Short human-readable message.
    pub message: String,
    /// Machine-readable code, e.g. `UNAUTHORIZED`.
    pub code: &'static str,
    pub status_code: u16,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            code,
            status_code: status.as_u16(),
        }
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, CODE_UNAUTHORIZED, message)
    }

    /// Reported as 500, matching how the gate reports a missing auth setup.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            CODE_SERVICE_UNAVAILABLE,
            message,
        )
    }

    pub fn failed_dependency(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FAILED_DEPENDENCY, CODE_FAILED_DEPENDENCY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ErrorEnvelope::new(self.status, self.code, self.message).into_response_with(self.status)
    }
}
