// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth 2.0 on-behalf-of exchange.
//!
//! Trades the caller's access token for a credential scoped to the directory
//! API, so downstream calls run with the caller's identity rather than the
//! application's.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::client::DirectoryClient;
use crate::config::TrustConfig;

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ON_BEHALF_OF: &str = "on_behalf_of";

/// Timeout for one token request.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    #[error("could not create on-behalf-of credential: {0}")]
    CredentialCreationFailed(String),

    #[error("could not create directory client: {0}")]
    ClientCreationFailed(String),
}

/// Access token issued for the directory API on the caller's behalf.
#[derive(Clone)]
pub struct DelegatedCredential {
    access_token: String,
    expires_in: Option<u64>,
}

impl DelegatedCredential {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    #[cfg(test)]
    pub(crate) fn for_tests(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            expires_in: None,
        }
    }
}

impl std::fmt::Debug for DelegatedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatedCredential")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Performs on-behalf-of exchanges against the tenant's token endpoint.
#[derive(Debug, Clone)]
pub struct CredentialExchanger {
    http: Client,
    trust: Arc<TrustConfig>,
}

impl CredentialExchanger {
    pub fn new(trust: Arc<TrustConfig>) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .map_err(|e| {
                ExchangeError::ClientCreationFailed(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self::with_client(http, trust))
    }

    pub fn with_client(http: Client, trust: Arc<TrustConfig>) -> Self {
        Self { http, trust }
    }

    /// Exchange the caller's token and return a directory client acting as
    /// the caller.
    ///
    /// Nothing is cached: every call performs a fresh exchange.
    pub async fn exchange_on_behalf_of(
        &self,
        user_token: &str,
    ) -> Result<DirectoryClient, ExchangeError> {
        info!(tenant_id = %self.trust.tenant_id(), "Exchanging token on behalf of caller");

        let credential = self.acquire_credential(user_token).await?;
        DirectoryClient::new(
            self.http.clone(),
            self.trust.directory_base_url().clone(),
            credential,
        )
    }

    /// Token request half of the exchange.
    pub async fn acquire_credential(
        &self,
        user_token: &str,
    ) -> Result<DelegatedCredential, ExchangeError> {
        if user_token.trim().is_empty() {
            return Err(ExchangeError::CredentialCreationFailed(
                "user assertion is empty".to_string(),
            ));
        }

        let form = [
            ("grant_type", JWT_BEARER_GRANT),
            ("client_id", self.trust.client_id()),
            ("client_secret", self.trust.client_secret()),
            ("assertion", user_token),
            ("scope", self.trust.directory_scope()),
            ("requested_token_use", ON_BEHALF_OF),
        ];

        let response = self
            .http
            .post(self.trust.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ExchangeError::CredentialCreationFailed(format!("token request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: TokenErrorResponse = response.json().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                error = %body.error,
                error_description = %body.error_description,
                "On-behalf-of token request rejected"
            );
            return Err(ExchangeError::CredentialCreationFailed(format!(
                "token endpoint returned {status}: {}",
                body.error
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ExchangeError::CredentialCreationFailed(format!("invalid token response: {e}"))
        })?;

        if token.access_token.trim().is_empty() {
            return Err(ExchangeError::CredentialCreationFailed(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(DelegatedCredential {
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }
}
