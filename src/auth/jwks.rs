// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key set fetching and refresh.
//!
//! ## Behavior
//!
//! - Keys are fetched once at startup; failure there aborts startup
//! - A background task re-fetches the set every refresh interval (1 hour)
//! - An unknown `kid` triggers one on-demand refresh; misses that queue up
//!   behind a running refresh share its result instead of fetching again
//! - A failed refresh keeps the previous keys (availability over freshness)
//! - Each refresh swaps in a complete new map; readers see the old or the new
//!   set, never a mix
//!
//! ## Usage
//!
//! Build with `KeySetProvider::fetch` in main.rs, share it behind an `Arc`
//! with the `TokenValidator`, and start `spawn_refresh` with the shutdown token.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_JWKS_REFRESH_INTERVAL;

/// Timeout for a single key set fetch.
pub const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, thiserror::Error)]
pub enum KeySetError {
    #[error("JWKS request failed: {0}")]
    Fetch(String),

    #[error("JWKS endpoint returned HTTP {0}")]
    Status(u16),

    #[error("JWKS document is invalid: {0}")]
    Parse(String),

    #[error("JWKS document contains no usable signing keys")]
    Empty,

    #[error("no signing key with id '{0}'")]
    UnknownKey(String),
}

/// A verification key with the algorithm it is used with.
#[derive(Clone)]
pub struct SigningKey {
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

type KeySet = HashMap<String, SigningKey>;

/// Owns the signing key set for one identity provider tenant.
pub struct KeySetProvider {
    jwks_url: String,
    client: reqwest::Client,
    refresh_interval: Duration,
    keys: RwLock<Arc<KeySet>>,
    /// Held across an on-demand refresh so only one fetch is in flight.
    on_demand: Mutex<()>,
    /// Number of finished on-demand refresh attempts.
    on_demand_attempts: AtomicU64,
}

impl KeySetProvider {
    /// Fetch the key set and build a provider around it.
    pub async fn fetch(
        jwks_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self, KeySetError> {
        let provider = Self::with_keys(jwks_url.into(), client, KeySet::new());
        let count = provider.refresh().await?;
        info!(jwks_url = %provider.jwks_url, keys = count, "Signing keys loaded");
        Ok(provider)
    }

    /// Build a provider from an already obtained key set.
    pub fn from_jwk_set(
        jwks_url: impl Into<String>,
        client: reqwest::Client,
        jwks: &JwkSet,
    ) -> Result<Self, KeySetError> {
        let keys = build_key_set(jwks)?;
        Ok(Self::with_keys(jwks_url.into(), client, keys))
    }

    fn with_keys(jwks_url: String, client: reqwest::Client, keys: KeySet) -> Self {
        Self {
            jwks_url,
            client,
            refresh_interval: DEFAULT_JWKS_REFRESH_INTERVAL,
            keys: RwLock::new(Arc::new(keys)),
            on_demand: Mutex::new(()),
            on_demand_attempts: AtomicU64::new(0),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// In-memory lookup against the current snapshot.
    pub async fn lookup(&self, kid: &str) -> Option<SigningKey> {
        let snapshot = self.snapshot().await;
        snapshot.get(kid).cloned()
    }

    pub async fn key_count(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_ready(&self) -> bool {
        self.key_count().await > 0
    }

    async fn snapshot(&self) -> Arc<KeySet> {
        Arc::clone(&*self.keys.read().await)
    }

    /// Look up `kid`, refreshing the set once if it is unknown.
    ///
    /// Every miss gets one refresh attempt. A miss that queued behind a
    /// refresh already in flight shares that attempt instead of fetching again.
    pub async fn resolve(&self, kid: &str) -> Result<SigningKey, KeySetError> {
        if let Some(key) = self.lookup(kid).await {
            return Ok(key);
        }
        let seen = self.on_demand_attempts.load(Ordering::Acquire);

        {
            let _guard = self.on_demand.lock().await;

            if let Some(key) = self.lookup(kid).await {
                return Ok(key);
            }

            if self.on_demand_attempts.load(Ordering::Acquire) != seen {
                debug!(kid, "Unknown signing key, sharing a refresh that ran while waiting");
            } else {
                info!(kid, "Unknown signing key, refreshing key set");
                if let Err(e) = self.refresh().await {
                    error!(jwks_url = %self.jwks_url, error = %e, "On-demand key set refresh failed");
                }
                self.on_demand_attempts.fetch_add(1, Ordering::Release);
            }
        }

        self.lookup(kid)
            .await
            .ok_or_else(|| KeySetError::UnknownKey(kid.to_string()))
    }

    /// Fetch the key set and replace the current snapshot.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<usize, KeySetError> {
        let jwks = self.fetch_jwks().await?;
        let keys = build_key_set(&jwks)?;
        let count = keys.len();

        *self.keys.write().await = Arc::new(keys);
        debug!(jwks_url = %self.jwks_url, keys = count, "Key set replaced");
        Ok(count)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, KeySetError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .timeout(JWKS_FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| KeySetError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeySetError::Parse(e.to_string()))
    }

    /// Start the periodic refresh task.
    ///
    /// The task exits when `shutdown` is cancelled.
    pub fn spawn_refresh(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_refresh(shutdown))
    }

    async fn run_refresh(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.refresh_interval.as_secs(),
            "Key set refresh task starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.refresh_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Key set refresh task shutting down");
                    return;
                }
            }

            match self.refresh().await {
                Ok(count) => debug!(keys = count, "Periodic key set refresh succeeded"),
                Err(e) => warn!(
                    jwks_url = %self.jwks_url,
                    error = %e,
                    "Periodic key set refresh failed, keeping previous keys"
                ),
            }
        }
    }
}

fn build_key_set(jwks: &JwkSet) -> Result<KeySet, KeySetError> {
    let mut keys = KeySet::new();

    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            debug!("Skipping JWK without kid");
            continue;
        };

        match jwk_to_signing_key(jwk) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(reason) => debug!(kid = %kid, reason = %reason, "Skipping unusable JWK"),
        }
    }

    if keys.is_empty() {
        return Err(KeySetError::Empty);
    }
    Ok(keys)
}

/// Convert a JWK to a decoding key and its algorithm.
fn jwk_to_signing_key(jwk: &Jwk) -> Result<SigningKey, String> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let decoding = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| format!("invalid RSA key: {e}"))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok(SigningKey {
                decoding,
                algorithm,
            })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let decoding = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| format!("invalid EC key: {e}"))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok(SigningKey {
                decoding,
                algorithm,
            })
        }
        _ => Err("unsupported key type".to_string()),
    }
}
