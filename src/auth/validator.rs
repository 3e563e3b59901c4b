// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Parse and verify the signature against the tenant's signing keys
//! 2. Signature/validity outcome of the parse step
//! 3. Decode the payload into [`Claims`]
//! 4. Expiry is set and in the future
//! 5. Issuer is `https://sts.windows.net/{tenant}/`
//! 6. Audience contains the client id
//! 7. Tenant id matches the configured tenant
//!
//! Issuer is checked before tenant, so a token carrying both a foreign issuer
//! and a foreign tenant is reported as an issuer failure.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::Value;
use tracing::debug;

use super::claims::Claims;
use super::error::AuthError;
use super::jwks::{KeySetError, KeySetProvider};
use crate::config::TrustConfig;

/// Upper bound on raw token size, checked before any parsing.
pub const MAX_TOKEN_SIZE_BYTES: usize = 16 * 1024;

/// Validates bearer tokens for one tenant and client.
pub struct TokenValidator {
    keys: Arc<KeySetProvider>,
    trust: Arc<TrustConfig>,
}

impl TokenValidator {
    pub fn new(keys: Arc<KeySetProvider>, trust: Arc<TrustConfig>) -> Self {
        Self { keys, trust }
    }

    pub fn keys(&self) -> &Arc<KeySetProvider> {
        &self.keys
    }

    pub fn trust(&self) -> &Arc<TrustConfig> {
        &self.trust
    }

    /// Validate a raw bearer token and return its claims.
    pub async fn validate(&self, raw: &str) -> Result<Claims, AuthError> {
        if raw.len() > MAX_TOKEN_SIZE_BYTES {
            return Err(AuthError::MalformedOrUnsigned(format!(
                "token is {} bytes, limit is {MAX_TOKEN_SIZE_BYTES}",
                raw.len()
            )));
        }

        let header =
            decode_header(raw).map_err(|e| AuthError::MalformedOrUnsigned(e.to_string()))?;

        let kid = header
            .kid
            .ok_or_else(|| AuthError::MalformedOrUnsigned("token header has no kid".to_string()))?;

        let key = self.keys.resolve(&kid).await.map_err(|e| match e {
            KeySetError::UnknownKey(_) => AuthError::InvalidSignature(e.to_string()),
            other => AuthError::MalformedOrUnsigned(other.to_string()),
        })?;

        if header.alg != key.algorithm {
            return Err(AuthError::MalformedOrUnsigned(format!(
                "token algorithm {:?} does not match key algorithm {:?}",
                header.alg, key.algorithm
            )));
        }

        // Expiry, issuer and audience are checked below, in order.
        let mut validation = Validation::new(key.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let payload = decode::<Value>(raw, &key.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature(e.to_string()),
                _ => AuthError::MalformedOrUnsigned(e.to_string()),
            }
        })?;

        let claims: Claims = serde_json::from_value(payload.claims)
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;

        check_claims(&claims, &self.trust, chrono::Utc::now().timestamp())?;

        debug!(
            kid = %kid,
            tenant_id = %claims.tenant_id(),
            subject = %claims.subject_id(),
            "Token validated"
        );

        Ok(claims)
    }
}

/// Expiry, issuer, audience and tenant checks, in that order.
pub fn check_claims(claims: &Claims, trust: &TrustConfig, now: i64) -> Result<(), AuthError> {
    if claims.exp == 0 {
        return Err(AuthError::ExpiryNotSet);
    }
    if now >= claims.exp {
        return Err(AuthError::Expired {
            expired_at: claims.exp,
            now,
        });
    }

    let expected_issuer = trust.expected_issuer();
    if claims.iss != expected_issuer {
        return Err(AuthError::InvalidIssuer {
            actual: claims.iss.clone(),
            expected: expected_issuer,
        });
    }

    let audience_ok = claims
        .aud
        .as_ref()
        .is_some_and(|aud| aud.contains(trust.client_id()));
    if !audience_ok {
        return Err(AuthError::InvalidAudience);
    }

    if claims.tid != trust.tenant_id() {
        return Err(AuthError::InvalidTenant {
            actual: claims.tid.clone(),
        });
    }

    Ok(())
}
