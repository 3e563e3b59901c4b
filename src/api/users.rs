// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{ContextError, SecurityContext};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Tenant the caller belongs to
    pub tenant_id: String,
    /// Caller's directory object id
    pub user_id: String,
    /// Caller's display name
    pub user_name: String,
}

impl TryFrom<&SecurityContext> for UserMeResponse {
    type Error = ContextError;

    fn try_from(ctx: &SecurityContext) -> Result<Self, Self::Error> {
        Ok(Self {
            tenant_id: ctx.tenant_id()?.to_string(),
            user_id: ctx.user_id()?.to_string(),
            user_name: ctx.user_name()?.to_string(),
        })
    }
}

/// Get the current authenticated user's identity.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(ctx: SecurityContext) -> Result<Json<UserMeResponse>, ContextError> {
    Ok(Json(UserMeResponse::try_from(&ctx)?))
}
