// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthState;
use crate::directory::CredentialExchanger;

#[derive(Clone, Default)]
pub struct AppState {
    pub auth: AuthState,
    /// `None` when the server runs without identity provider settings.
    pub exchanger: Option<Arc<CredentialExchanger>>,
}

impl AppState {
    pub fn new(auth: AuthState, exchanger: Arc<CredentialExchanger>) -> Self {
        Self {
            auth,
            exchanger: Some(exchanger),
        }
    }
}
