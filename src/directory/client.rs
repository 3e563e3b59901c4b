// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Directory API client acting with a delegated credential.

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client,
};
use serde::Deserialize;
use url::Url;

use super::exchange::{DelegatedCredential, ExchangeError};

/// Fields requested for the current user.
const USER_SELECT: &str =
    "id,displayName,surname,givenName,mail,mobilePhone,jobTitle,officeLocation,department";
const MANAGER_EXPAND: &str = "manager($select=id)";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Request(String),

    #[error("directory returned HTTP {status}: {code}")]
    Status { status: u16, code: String },

    #[error("directory response was invalid: {0}")]
    InvalidResponse(String),
}

/// User object as returned by the directory API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub office_location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub manager: Option<DirectoryObjectRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryObjectRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl DirectoryUser {
    /// Manager's object id, or empty when the user has none.
    pub fn manager_id(&self) -> &str {
        self.manager
            .as_ref()
            .and_then(|manager| manager.id.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
}

/// Directory client bound to one delegated credential.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl DirectoryClient {
    pub fn new(
        http: Client,
        base_url: Url,
        credential: DelegatedCredential,
    ) -> Result<Self, ExchangeError> {
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ExchangeError::ClientCreationFailed(format!(
                "unusable directory base URL: {base_url}"
            )));
        }

        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", credential.access_token())).map_err(
                |_| {
                    ExchangeError::ClientCreationFailed(
                        "delegated credential is not a valid header value".to_string(),
                    )
                },
            )?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            http,
            base_url,
            headers,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The signed-in user, with the manager's id expanded.
    pub async fn current_user(&self) -> Result<DirectoryUser, DirectoryError> {
        let url = self
            .base_url
            .join("me")
            .map_err(|e| DirectoryError::Request(format!("invalid directory URL: {e}")))?;

        let response = self
            .http
            .get(url)
            .headers(self.headers.clone())
            .query(&[("$select", USER_SELECT), ("$expand", MANAGER_EXPAND)])
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(DirectoryError::Status {
                status,
                code: body.error.code,
            });
        }

        response
            .json::<DirectoryUser>()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))
    }
}
