// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cookie attribute configuration shared by every cookie the gateway writes

use rocket::http::{Cookie, SameSite};
use rocket::time::{Duration, OffsetDateTime};
use serde::{Deserialize, Serialize};

/// Default name of the short-lived "auth in progress" cookie.
pub const AUTH_COOKIE_NAME: &str = "openid-proxy-auth";
/// Default name of the long-lived "logged in" cookie.
pub const LOGIN_COOKIE_NAME: &str = "openid-proxy-session";

/// Lifetime of an authorization attempt (5 minutes).
pub const AUTH_COOKIE_MAX_AGE: i64 = 300;
/// Lifetime of a logged-in session (8 hours).
pub const LOGIN_COOKIE_MAX_AGE: i64 = 28_800;

/// `SameSite` policy applied to a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Attributes used when a cookie is written to the response.
///
/// `max_age` follows the usual cookie conventions:
///
/// * `max_age > 0` - `Max-Age` is set and `Expires` is set to now + `max_age`
/// * `max_age < 0` - the cookie is deleted now (`Max-Age=0`, `Expires` in 1970)
/// * `max_age == 0` - no `Max-Age`, the cookie lives for the browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name.
    pub name: String,
    /// Cookie domain. When absent the browser uses the host of the response.
    pub domain: Option<String>,
    /// Cookie path.
    pub path: String,
    /// Lifetime in seconds, see the type level documentation.
    pub max_age: i64,
    /// Hide the cookie from javascript.
    pub http_only: bool,
    /// Only send the cookie over HTTPS.
    pub secure: bool,
    /// Cross-site policy. Must not be `strict` for the auth cookie, the
    /// identity provider redirects back with a cross-site navigation.
    pub same_site: SameSitePolicy,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: LOGIN_COOKIE_NAME.to_string(),
            domain: None,
            path: "/".to_string(),
            max_age: LOGIN_COOKIE_MAX_AGE,
            http_only: true,
            secure: true,
            same_site: SameSitePolicy::Lax,
        }
    }
}

impl CookieConfig {
    /// Defaults of the short-lived cookie holding `state` and the PKCE verifier.
    pub fn auth_session() -> Self {
        Self {
            name: AUTH_COOKIE_NAME.to_string(),
            max_age: AUTH_COOKIE_MAX_AGE,
            ..Self::default()
        }
    }

    /// Defaults of the long-lived cookie holding the resolved identity.
    pub fn login_session() -> Self {
        Self::default()
    }

    /// Build the cookie `name=value` carrying these attributes.
    pub fn cookie(&self, name: &str, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), value);
        self.apply(&mut cookie, self.max_age);
        cookie
    }

    /// Build a cookie that clears `name` in the browser.
    ///
    /// Path and domain must match the cookie being cleared, otherwise the
    /// browser keeps the original.
    pub fn removal(&self, name: &str) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), String::new());
        self.apply(&mut cookie, -1);
        cookie
    }

    fn apply(&self, cookie: &mut Cookie<'static>, max_age: i64) {
        cookie.set_path(self.path.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie.set_http_only(self.http_only);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::from(self.same_site));

        if max_age > 0 {
            cookie.set_max_age(Duration::seconds(max_age));
        } else if max_age < 0 {
            cookie.set_max_age(Duration::ZERO);
        }
        if let Some(expires) = expires_at(max_age) {
            cookie.set_expires(expires);
        }
    }
}

/// `Expires` value matching a `max_age`, older user agents ignore `Max-Age`.
fn expires_at(max_age: i64) -> Option<OffsetDateTime> {
    if max_age > 0 {
        Some(OffsetDateTime::now_utc() + Duration::seconds(max_age))
    } else if max_age < 0 {
        // first second of the epoch
        Some(OffsetDateTime::UNIX_EPOCH + Duration::seconds(1))
    } else {
        None
    }
}
