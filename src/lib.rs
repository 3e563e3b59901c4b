// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ITSM Admin API - Tenant authentication gate and delegated directory access
//!
//! This crate authenticates callers of the multi-tenant admin API against
//! Entra ID and makes directory calls on their behalf.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token validation, security context and the authentication gate
//! - `config` - Environment configuration
//! - `directory` - On-behalf-of exchange and directory client
//! - `oauth` - Authorization request helpers (state, PKCE)

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod oauth;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
