// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the typed configuration loaded
//! from them once at startup. Nothing here is mutated after `main` builds it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENTRA_TENANT_ID` | Identity provider tenant id | Required |
//! | `ENTRA_CLIENT_ID` | Application (client) id, expected token audience | Required |
//! | `ENTRA_CLIENT_SECRET` | Client secret used for on-behalf-of exchange | Required |
//! | `REDIRECT_URI` | OAuth redirect URI | `http://localhost:8080/callback` |
//! | `APPLICATION_GRAPH_API_SCOPE` | Scope requested for directory access | `https://graph.microsoft.com/.default` |
//! | `ENTRA_LOGIN_BASE_URL` | Identity provider base URL | `https://login.microsoftonline.com/` |
//! | `GRAPH_API_BASE_URL` | Directory API base URL | `https://graph.microsoft.com/v1.0/` |
//! | `JWKS_REFRESH_INTERVAL_SECS` | Background signing key refresh interval | `3600` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Empty values are treated as unset.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::auth::jwks::KeySetError;

pub const ENTRA_TENANT_ID_ENV: &str = "ENTRA_TENANT_ID";
pub const ENTRA_CLIENT_ID_ENV: &str = "ENTRA_CLIENT_ID";
pub const ENTRA_CLIENT_SECRET_ENV: &str = "ENTRA_CLIENT_SECRET";
pub const REDIRECT_URI_ENV: &str = "REDIRECT_URI";
pub const DIRECTORY_SCOPE_ENV: &str = "APPLICATION_GRAPH_API_SCOPE";
pub const LOGIN_BASE_URL_ENV: &str = "ENTRA_LOGIN_BASE_URL";
pub const DIRECTORY_BASE_URL_ENV: &str = "GRAPH_API_BASE_URL";
pub const JWKS_REFRESH_INTERVAL_ENV: &str = "JWKS_REFRESH_INTERVAL_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const DEFAULT_DIRECTORY_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFAULT_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_DIRECTORY_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Signing keys are re-fetched hourly.
pub const DEFAULT_JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Issuer host of v1.0 access tokens.
const V1_ISSUER_BASE: &str = "https://sts.windows.net/";

/// Fatal startup errors. None of these are ever produced per request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("{name} has an invalid value: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("failed to load signing keys: {0}")]
    KeySetUnavailable(#[from] KeySetError),
}

/// Identity provider trust configuration.
///
/// Shared read-only by every request once loaded.
#[derive(Clone)]
pub struct TrustConfig {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    directory_scope: String,
    login_base_url: Url,
    directory_base_url: Url,
    jwks_refresh_interval: Duration,
}

impl TrustConfig {
    /// Build a configuration from the three required values, applying
    /// defaults for everything else.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let tenant_id = required(ENTRA_TENANT_ID_ENV, tenant_id.into())?;
        let client_id = required(ENTRA_CLIENT_ID_ENV, client_id.into())?;
        let client_secret = required(ENTRA_CLIENT_SECRET_ENV, client_secret.into())?;

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            directory_scope: DEFAULT_DIRECTORY_SCOPE.to_string(),
            login_base_url: parse_base_url(LOGIN_BASE_URL_ENV, DEFAULT_LOGIN_BASE_URL)?,
            directory_base_url: parse_base_url(DIRECTORY_BASE_URL_ENV, DEFAULT_DIRECTORY_BASE_URL)?,
            jwks_refresh_interval: DEFAULT_JWKS_REFRESH_INTERVAL,
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(
            get(ENTRA_TENANT_ID_ENV).unwrap_or_default(),
            get(ENTRA_CLIENT_ID_ENV).unwrap_or_default(),
            get(ENTRA_CLIENT_SECRET_ENV).unwrap_or_default(),
        )?;

        if let Some(uri) = get(REDIRECT_URI_ENV) {
            config.redirect_uri = uri;
        }
        if let Some(scope) = get(DIRECTORY_SCOPE_ENV) {
            config.directory_scope = scope;
        }
        if let Some(base) = get(LOGIN_BASE_URL_ENV) {
            config.login_base_url = parse_base_url(LOGIN_BASE_URL_ENV, &base)?;
        }
        if let Some(base) = get(DIRECTORY_BASE_URL_ENV) {
            config.directory_base_url = parse_base_url(DIRECTORY_BASE_URL_ENV, &base)?;
        }
        if let Some(secs) = get(JWKS_REFRESH_INTERVAL_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: JWKS_REFRESH_INTERVAL_ENV,
                reason: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    name: JWKS_REFRESH_INTERVAL_ENV,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.jwks_refresh_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_directory_scope(mut self, scope: impl Into<String>) -> Self {
        self.directory_scope = scope.into();
        self
    }

    /// Point the configuration at another identity provider host (tests, sovereign clouds).
    pub fn with_login_base_url(mut self, base: &str) -> Result<Self, ConfigError> {
        self.login_base_url = parse_base_url(LOGIN_BASE_URL_ENV, base)?;
        Ok(self)
    }

    pub fn with_directory_base_url(mut self, base: &str) -> Result<Self, ConfigError> {
        self.directory_base_url = parse_base_url(DIRECTORY_BASE_URL_ENV, base)?;
        Ok(self)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn directory_scope(&self) -> &str {
        &self.directory_scope
    }

    pub fn directory_base_url(&self) -> &Url {
        &self.directory_base_url
    }

    pub fn jwks_refresh_interval(&self) -> Duration {
        self.jwks_refresh_interval
    }

    pub fn authorize_url(&self) -> String {
        format!("{}{}/oauth2/v2.0/authorize", self.login_base_url, self.tenant_id)
    }

    pub fn token_url(&self) -> String {
        format!("{}{}/oauth2/v2.0/token", self.login_base_url, self.tenant_id)
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{}/discovery/v2.0/keys", self.login_base_url, self.tenant_id)
    }

    /// Issuer every accepted access token must carry.
    ///
    /// This is the v1.0 form even though the endpoints above are v2.0.
    /// Tokens issued in the v2.0 form (`.../{tenant}/v2.0`) are rejected.
    pub fn expected_issuer(&self) -> String {
        format!("{V1_ISSUER_BASE}{}/", self.tenant_id)
    }

    /// Scopes requested during interactive sign-in.
    pub fn login_scopes(&self) -> Vec<String> {
        vec![
            "openid".to_string(),
            "profile".to_string(),
            "offline_access".to_string(),
            format!("api://{}/user_impersonation", self.client_id),
        ]
    }
}

impl fmt::Debug for TrustConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("directory_scope", &self.directory_scope)
            .field("login_base_url", &self.login_base_url.as_str())
            .field("directory_base_url", &self.directory_base_url.as_str())
            .field("jwks_refresh_interval", &self.jwks_refresh_interval)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Listener and logging settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(port) => port.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") | Some("console") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_format,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value)
}

/// Parse a base URL, forcing a trailing slash so relative joins keep the path.
fn parse_base_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            name,
            reason: "URL cannot be used as a base".to_string(),
        });
    }

    Ok(url)
}
