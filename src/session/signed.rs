// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HMAC-SHA256 signed session cookies
//!
//! ## Wire format
//!
//! ```text
//! value   = B64URL(payload) "." B64URL(tag)
//! payload = {"values": {...}, "exp": <unix seconds> | null}
//! tag     = HMAC-SHA256(key, name "|" B64URL(payload))
//! ```
//!
//! The cookie name is part of the signed input, so the value of one session
//! cannot be replayed under the name of another one. The expiry is taken from
//! the session `max_age` when it is saved and is enforced when it is read,
//! independently of what the browser does with `Max-Age`.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use rocket::http::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

use super::{CookieConfig, Session, SessionError, SessionStore};

type HmacSha256 = Hmac<Sha256>;

/// Largest cookie value browsers are guaranteed to keep.
pub const MAX_COOKIE_VALUE_BYTES: usize = 4096;

#[derive(Serialize)]
struct PayloadRef<'a> {
    values: &'a Map<String, Value>,
    exp: Option<i64>,
}

#[derive(Deserialize)]
struct Payload {
    values: Map<String, Value>,
    exp: Option<i64>,
}

/// Reasons a cookie value is not accepted, only ever logged.
#[derive(Debug, thiserror::Error)]
enum OpenError {
    #[error("malformed value")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("expired")]
    Expired,
}

/// [`SessionStore`] keeping each session in a signed cookie.
///
/// Cookie attributes come from the store defaults unless a configuration was
/// registered for the session name with [`SignedCookieStore::with_session`].
#[derive(Clone)]
pub struct SignedCookieStore {
    mac: HmacSha256,
    defaults: CookieConfig,
    sessions: HashMap<String, CookieConfig>,
}

impl SignedCookieStore {
    /// Create a store signing with `key`. The key must not be empty.
    pub fn new(key: &[u8]) -> Result<Self, SessionError> {
        if key.is_empty() {
            return Err(SessionError::InvalidKey("empty key".to_string()));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| SessionError::InvalidKey(e.to_string()))?;

        Ok(Self {
            mac,
            defaults: CookieConfig::default(),
            sessions: HashMap::new(),
        })
    }

    /// Replace the attributes used for sessions without a registered configuration.
    pub fn with_defaults(mut self, defaults: CookieConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Register the cookie attributes of the session called `config.name`.
    pub fn with_session(mut self, config: CookieConfig) -> Self {
        self.sessions.insert(config.name.clone(), config);
        self
    }

    fn config_for(&self, name: &str) -> CookieConfig {
        match self.sessions.get(name) {
            Some(config) => config.clone(),
            None => CookieConfig {
                name: name.to_string(),
                ..self.defaults.clone()
            },
        }
    }

    /// Encode and sign a session into a cookie value.
    pub fn seal(&self, session: &Session) -> Result<String, SessionError> {
        let exp = (session.config.max_age > 0)
            .then(|| Utc::now().timestamp() + session.config.max_age);
        let json = serde_json::to_vec(&PayloadRef {
            values: &session.values,
            exp,
        })
        .map_err(|source| SessionError::Encode {
            name: session.name().to_string(),
            source,
        })?;

        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = self.tag(session.name(), &payload).finalize().into_bytes();
        let value = format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(tag));

        if value.len() > MAX_COOKIE_VALUE_BYTES {
            return Err(SessionError::TooLarge {
                name: session.name().to_string(),
                size: value.len(),
                limit: MAX_COOKIE_VALUE_BYTES,
            });
        }
        Ok(value)
    }

    /// Verify and decode a cookie value written by [`SignedCookieStore::seal`].
    fn open(&self, name: &str, value: &str) -> Result<Map<String, Value>, OpenError> {
        let (payload, tag) = value.split_once('.').ok_or(OpenError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| OpenError::Malformed)?;

        self.tag(name, payload)
            .verify_slice(&tag)
            .map_err(|_| OpenError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| OpenError::Malformed)?;
        let payload: Payload = serde_json::from_slice(&json).map_err(|_| OpenError::Malformed)?;

        if let Some(exp) = payload.exp {
            if exp <= Utc::now().timestamp() {
                return Err(OpenError::Expired);
            }
        }
        Ok(payload.values)
    }

    fn tag(&self, name: &str, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(payload.as_bytes());
        mac
    }
}

impl SessionStore for SignedCookieStore {
    fn get(&self, jar: &CookieJar<'_>, name: &str) -> Result<Session, SessionError> {
        let cookie = jar
            .get(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

        let values = self.open(name, cookie.value()).map_err(|e| {
            debug!("Rejecting {:?} session cookie: {}", name, e);
            SessionError::NotFound(name.to_string())
        })?;

        let mut session = self.new_session(name);
        session.values = values;
        Ok(session)
    }

    fn new_session(&self, name: &str) -> Session {
        Session::new(name, self.config_for(name))
    }

    fn save(&self, jar: &CookieJar<'_>, session: &Session) -> Result<(), SessionError> {
        let value = self.seal(session)?;
        jar.add(session.config.cookie(session.name(), value));
        Ok(())
    }

    fn destroy(&self, jar: &CookieJar<'_>, name: &str) {
        jar.add(self.config_for(name).removal(name));
    }
}
