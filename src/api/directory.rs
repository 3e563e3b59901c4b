// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Directory endpoints, called on the user's behalf.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::SecurityContext;
use crate::directory::DirectoryUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Response for GET /v1/graph/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfoResponse {
    pub id: String,
    pub display_name: String,
    pub surname: String,
    pub given_name: String,
    pub email: String,
    pub mobile_phone: String,
    pub job_title: String,
    pub office_location: String,
    pub department: String,
    /// Manager's object id, empty when the user has no manager.
    pub manager: String,
}

impl From<DirectoryUser> for UserInfoResponse {
    fn from(user: DirectoryUser) -> Self {
        let manager = user.manager_id().to_string();
        Self {
            id: user.id.unwrap_or_default(),
            display_name: user.display_name.unwrap_or_default(),
            surname: user.surname.unwrap_or_default(),
            given_name: user.given_name.unwrap_or_default(),
            email: user.mail.unwrap_or_default(),
            mobile_phone: user.mobile_phone.unwrap_or_default(),
            job_title: user.job_title.unwrap_or_default(),
            office_location: user.office_location.unwrap_or_default(),
            department: user.department.unwrap_or_default(),
            manager,
        }
    }
}

/// Get the current user's profile from the directory.
///
/// The caller's token is exchanged on-behalf-of; the directory sees the
/// caller, not the application.
#[utoipa::path(
    get,
    path = "/v1/graph/users/me",
    tag = "Directory",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Directory profile", body = UserInfoResponse),
        (status = 401, description = "Unauthorized or delegated exchange failed"),
        (status = 424, description = "Directory request failed"),
    )
)]
pub async fn get_current_user_from_directory(
    State(state): State<AppState>,
    ctx: SecurityContext,
) -> Result<Json<UserInfoResponse>, ApiError> {
    let token = ctx
        .access_token()
        .map_err(|_| ApiError::unauthorized("Access token not found"))?;

    let exchanger = state
        .exchanger
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Authentication service not available"))?;

    let client = exchanger.exchange_on_behalf_of(token).await.map_err(|e| {
        warn!(error = %e, "Delegated credential exchange failed");
        ApiError::unauthorized("Failed to get user information")
    })?;

    let user = client.current_user().await.map_err(|e| {
        warn!(error = %e, "Directory lookup failed");
        ApiError::failed_dependency("Failed to get user information")
    })?;

    let response = UserInfoResponse::from(user);
    info!(user_id = %response.id, "Retrieved current user from directory");

    Ok(Json(response))
}
