// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization request helpers for interactive sign-in.
//!
//! The admin frontend drives the authorization code flow; these helpers build
//! the pieces it needs from the server's trust configuration.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::TrustConfig;

/// Random bytes behind each `state` value and PKCE verifier.
const RANDOM_BYTES: usize = 32;

pub const PKCE_METHOD: &str = "S256";

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("system random number generator failed")]
    Random,

    #[error("invalid authorize URL: {0}")]
    InvalidUrl(String),
}

/// PKCE verifier and its S256 challenge.
#[derive(Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

fn random_token(rng: &SystemRandom) -> Result<String, OAuthError> {
    let mut bytes = [0u8; RANDOM_BYTES];
    rng.fill(&mut bytes).map_err(|_| OAuthError::Random)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Opaque anti-forgery `state` value.
pub fn generate_state() -> Result<String, OAuthError> {
    random_token(&SystemRandom::new())
}

pub fn generate_pkce() -> Result<PkcePair, OAuthError> {
    let verifier = random_token(&SystemRandom::new())?;
    let challenge = pkce_challenge(&verifier);
    Ok(PkcePair {
        verifier,
        challenge,
    })
}

/// S256 code challenge for `verifier`.
pub fn pkce_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// Authorize endpoint URL requesting the sign-in scopes.
pub fn authorization_url(
    trust: &TrustConfig,
    state: &str,
    pkce: &PkcePair,
) -> Result<Url, OAuthError> {
    let mut url =
        Url::parse(&trust.authorize_url()).map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;

    url.query_pairs_mut()
        .append_pair("client_id", trust.client_id())
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", trust.redirect_uri())
        .append_pair("response_mode", "query")
        .append_pair("scope", &trust.login_scopes().join(" "))
        .append_pair("state", state)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", PKCE_METHOD);

    Ok(url)
}
