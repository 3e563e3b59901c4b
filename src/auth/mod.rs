// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Entra ID bearer token authentication for the admin API.
//!
//! ## Auth Flow
//!
//! 1. The frontend signs the user in against Entra ID and obtains an access token
//! 2. The frontend sends `Authorization: Bearer <access token>`
//! 3. The server:
//!    - Verifies the signature against the tenant's published signing keys
//!    - Checks expiry, issuer, audience and tenant, in that order
//!    - Attaches a [`SecurityContext`]:
//!      - `tid` → tenant id
//!      - `oid` → user id
//!      - `name` → user name
//!      - the raw token, for on-behalf-of calls
//!
//! ## Security
//!
//! - Every route except health and docs sits behind [`require_auth`]
//! - Signing keys are refreshed hourly and when an unknown key id shows up
//! - No clock skew leeway on expiry

pub mod claims;
pub mod context;
pub mod error;
pub mod jwks;
pub mod middleware;
pub mod validator;

pub use claims::{Audience, Claims};
pub use context::{ContextError, SecurityContext};
pub use error::AuthError;
pub use jwks::{KeySetError, KeySetProvider};
pub use middleware::{require_auth, AuthState};
pub use validator::TokenValidator;
