// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request security context.
//!
//! Attached to the request by the authentication gate once every token check
//! has passed. Handlers take it as an extractor:
//!
//! ```rust,ignore
//! async fn handler(ctx: SecurityContext) -> Result<Json<Me>, ContextError> {
//!     let tenant = ctx.tenant_id()?;
//!     // ...
//! }
//! ```

use std::fmt;

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{ErrorEnvelope, CODE_UNAUTHORIZED};

/// Identity of the authenticated caller.
///
/// Each field is read on its own; an absent or empty field is a distinct
/// [`ContextError`].
#[derive(Clone, Default)]
pub struct SecurityContext {
    tenant_id: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("tenant ID not found in context")]
    TenantIdNotFound,
    #[error("user ID not found in context")]
    UserIdNotFound,
    #[error("user name not found in context")]
    UserNameNotFound,
    #[error("access token not found in context")]
    AccessTokenNotFound,
    /// The route is not behind the authentication gate.
    #[error("security context not found")]
    NotAttached,
}

impl IntoResponse for ContextError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        ErrorEnvelope::new(status, CODE_UNAUTHORIZED, self.to_string()).into_response_with(status)
    }
}

impl SecurityContext {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
            access_token: Some(access_token.into()),
        }
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Attach to a request so downstream extractors can read it.
    pub fn attach(self, mut request: Request) -> Request {
        request.extensions_mut().insert(self);
        request
    }

    pub fn tenant_id(&self) -> Result<&str, ContextError> {
        present(&self.tenant_id).ok_or(ContextError::TenantIdNotFound)
    }

    pub fn user_id(&self) -> Result<&str, ContextError> {
        present(&self.user_id).ok_or(ContextError::UserIdNotFound)
    }

    pub fn user_name(&self) -> Result<&str, ContextError> {
        present(&self.user_name).ok_or(ContextError::UserNameNotFound)
    }

    /// The caller's raw bearer token, for delegated calls made on their behalf.
    pub fn access_token(&self) -> Result<&str, ContextError> {
        present(&self.access_token).ok_or(ContextError::AccessTokenNotFound)
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = ContextError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .ok_or(ContextError::NotAttached)
    }
}
