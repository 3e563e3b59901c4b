// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token claims issued by Entra ID.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Claims carried by an Entra ID access token.
///
/// A flat view over the payload: registered and provider-specific claims
/// side by side. Nothing here is trusted until the validator's checks pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    /// Audience; see [`Audience`] for the accepted encodings.
    #[serde(default)]
    pub aud: Option<Audience>,

    #[serde(default)]
    pub iss: String,

    /// Pairwise subject identifier.
    #[serde(default)]
    pub sub: String,

    /// Object id of the user in the tenant directory.
    #[serde(default)]
    pub oid: String,

    /// Tenant id the token was issued for.
    #[serde(default)]
    pub tid: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub upn: String,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Space-separated delegated scopes.
    #[serde(default)]
    pub scp: String,

    #[serde(default)]
    pub appid: String,

    #[serde(default)]
    pub ipaddr: String,

    /// Expiration (Unix seconds). Zero means the claim was absent.
    #[serde(default)]
    pub exp: i64,

    #[serde(default)]
    pub iat: i64,

    #[serde(default)]
    pub nbf: Option<i64>,
}

impl Claims {
    pub fn tenant_id(&self) -> &str {
        &self.tid
    }

    /// Stable user identifier: the directory object id, or `sub` when the
    /// token carries no `oid`.
    pub fn subject_id(&self) -> &str {
        if self.oid.is_empty() {
            &self.sub
        } else {
            &self.oid
        }
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scp.split_whitespace().any(|s| s == scope)
    }
}

/// The `aud` claim, decided once at decode time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum Audience {
    /// `"aud": "client"`
    Single(String),
    /// `"aud": [...]`; elements are narrowed to strings when matching.
    List(Vec<Value>),
    /// Any other JSON shape. Never matches.
    Unsupported(Value),
}

impl From<Value> for Audience {
    fn from(value: Value) -> Self {
        match value {
            Value::String(aud) => Audience::Single(aud),
            Value::Array(entries) => Audience::List(entries),
            other => Audience::Unsupported(other),
        }
    }
}

impl Audience {
    /// Whether `expected` is one of the audiences, by exact string equality.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::List(entries) => entries.iter().any(|entry| match entry {
                Value::String(aud) => aud == expected,
                other => {
                    debug!(entry = %other, "Skipping non-string audience entry");
                    false
                }
            }),
            Audience::Unsupported(value) => {
                warn!(audience = %value, "Unsupported audience encoding, treating as no match");
                false
            }
        }
    }
}
