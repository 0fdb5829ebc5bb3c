// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session cookie and signing secret settings

use serde::{Deserialize, Deserializer, Serialize};

use crate::session::{CookieConfig, SameSitePolicy};

/// Where the session signing secret is read from at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    /// `secret_key` names an environment variable.
    #[default]
    Env,
    /// `secret_key` is the path of a file holding the secret.
    File,
}

/// Where the anti-forgery state is kept between login and callback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateStoreKind {
    /// Bare state token in its own cookie. Cannot carry a PKCE verifier.
    Cookie,
    /// Signed auth session holding the state and the PKCE verifier.
    #[default]
    Session,
}

/// Configuration of the two session cookies and their signing secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub secret_source: SecretSource,

    /// Environment variable name or file path, depending on `secret_source`.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    #[serde(default)]
    pub state_store: StateStoreKind,

    /// Short-lived cookie spanning the login round trip.
    #[serde(
        default = "CookieConfig::auth_session",
        deserialize_with = "auth_cookie_over_defaults"
    )]
    pub auth_cookie: CookieConfig,

    /// Long-lived cookie holding the authenticated identity.
    #[serde(
        default = "CookieConfig::login_session",
        deserialize_with = "login_cookie_over_defaults"
    )]
    pub login_cookie: CookieConfig,
}

/// Cookie attributes as written in the file, each one optional.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CookieSection {
    name: Option<String>,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<i64>,
    http_only: Option<bool>,
    secure: Option<bool>,
    same_site: Option<SameSitePolicy>,
}

impl CookieSection {
    fn over(self, defaults: CookieConfig) -> CookieConfig {
        CookieConfig {
            name: self.name.unwrap_or(defaults.name),
            domain: self.domain.or(defaults.domain),
            path: self.path.unwrap_or(defaults.path),
            max_age: self.max_age.unwrap_or(defaults.max_age),
            http_only: self.http_only.unwrap_or(defaults.http_only),
            secure: self.secure.unwrap_or(defaults.secure),
            same_site: self.same_site.unwrap_or(defaults.same_site),
        }
    }
}

fn auth_cookie_over_defaults<'de, D>(deserializer: D) -> Result<CookieConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(CookieSection::deserialize(deserializer)?.over(CookieConfig::auth_session()))
}

fn login_cookie_over_defaults<'de, D>(deserializer: D) -> Result<CookieConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(CookieSection::deserialize(deserializer)?.over(CookieConfig::login_session()))
}

fn default_secret_key() -> String {
    "SESSION_SECRET".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_source: SecretSource::default(),
            secret_key: default_secret_key(),
            state_store: StateStoreKind::default(),
            auth_cookie: CookieConfig::auth_session(),
            login_cookie: CookieConfig::login_session(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cookie::{AUTH_COOKIE_MAX_AGE, LOGIN_COOKIE_MAX_AGE};

    #[test]
    fn partial_auth_cookie_keeps_auth_defaults() {
        let config: SessionConfig =
            serde_yml::from_str("auth_cookie:\n  name: my-auth\n").expect("valid yaml");

        assert_eq!(config.auth_cookie.name, "my-auth");
        assert_eq!(config.auth_cookie.max_age, AUTH_COOKIE_MAX_AGE);
        assert!(config.auth_cookie.secure);
        assert_eq!(config.login_cookie, CookieConfig::login_session());
    }

    #[test]
    fn partial_login_cookie_keeps_login_defaults() {
        let config: SessionConfig =
            serde_yml::from_str("login_cookie:\n  domain: example.com\n").expect("valid yaml");

        assert_eq!(config.login_cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(config.login_cookie.max_age, LOGIN_COOKIE_MAX_AGE);
        assert_eq!(config.auth_cookie, CookieConfig::auth_session());
    }
}
