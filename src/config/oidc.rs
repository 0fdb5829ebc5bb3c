// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity provider client settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration of the OpenID Connect relying party.
///
/// `issuer`, `client_id`, `client_secret` and `redirect_url` have no usable
/// default. They are left empty here and enforced by
/// [`Config::check_required`](super::Config::check_required) once command line
/// and environment overrides have been applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OidcConfig {
    /// Issuer URL, discovery is fetched from `{issuer}/.well-known/openid-configuration`.
    #[serde(default)]
    pub issuer: String,

    /// OAuth2 client identifier registered with the provider.
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret registered with the provider.
    #[serde(default)]
    pub client_secret: String,

    /// Absolute URL of the callback route as registered with the provider.
    #[serde(default)]
    pub redirect_url: String,

    /// Scopes requested in the authorization redirect.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Send a PKCE S256 challenge with the authorization request.
    #[serde(default = "default_pkce")]
    pub pkce: bool,

    /// Connection timeout for provider calls, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Total timeout for provider calls, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_scopes() -> Vec<String> {
    vec!["email".to_string(), "openid".to_string()]
}

fn default_pkce() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    5
}

impl OidcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            scopes: default_scopes(),
            pkce: default_pkce(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}
