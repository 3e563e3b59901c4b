// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delegated access to the tenant directory.
//!
//! [`CredentialExchanger`] turns the caller's access token into a
//! [`DirectoryClient`] through the on-behalf-of flow.

pub mod client;
pub mod exchange;

pub use client::{DirectoryClient, DirectoryError, DirectoryUser};
pub use exchange::{CredentialExchanger, DelegatedCredential, ExchangeError};
