// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cookie backed sessions
//!
//! A session is a named, string-keyed map of JSON values that lives entirely
//! in a browser cookie. There is no server side table: saving a session
//! writes a `Set-Cookie` header, loading one reads the request cookies back.
//!
//! The [`SessionStore`] trait is the capability handlers depend on, the
//! [`SignedCookieStore`] implementation signs every cookie it writes so that
//! values coming back from the browser can be trusted.

pub mod cookie;
pub mod signed;

use rocket::http::CookieJar;
use serde_json::{Map, Value};
use thiserror::Error;

pub use cookie::{CookieConfig, SameSitePolicy};
pub use signed::SignedCookieStore;

/// Errors raised by a [`SessionStore`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// No cookie, an unparsable one, a bad signature or an expired payload.
    #[error("{0:?} session not found")]
    NotFound(String),

    /// The signing key cannot be used.
    #[error("invalid session signing key: {0}")]
    InvalidKey(String),

    /// The session values could not be serialized.
    #[error("failed to encode {name:?} session: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The encoded cookie would be rejected by browsers.
    #[error("{name:?} session is {size} bytes, the limit is {limit}")]
    TooLarge {
        name: String,
        size: usize,
        limit: usize,
    },
}

/// A named session and the cookie attributes it will be saved with.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    name: String,
    /// Session values, saved as a JSON object.
    pub values: Map<String, Value>,
    /// Cookie attributes, may be changed before the session is saved.
    pub config: CookieConfig,
}

impl Session {
    /// Create an empty session.
    pub fn new(name: impl Into<String>, config: CookieConfig) -> Self {
        Self {
            name: name.into(),
            values: Map::new(),
            config,
        }
    }

    /// Name of the cookie backing this session.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a value under `key`, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Read a string value. `None` when missing or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }
}

/// Keyed session storage bound to the cookies of the current request.
///
/// Reads only look at the cookies the browser sent, writes only queue
/// response cookies, so implementations hold no per-request state.
pub trait SessionStore: Send + Sync {
    /// Load the session called `name` from the request cookies.
    fn get(&self, jar: &CookieJar<'_>, name: &str) -> Result<Session, SessionError>;

    /// Create an empty session seeded with the cookie configuration for `name`.
    fn new_session(&self, name: &str) -> Session;

    /// Serialize, sign and queue the session cookie on the response.
    fn save(&self, jar: &CookieJar<'_>, session: &Session) -> Result<(), SessionError>;

    /// Queue a cookie clearing the session called `name`.
    fn destroy(&self, jar: &CookieJar<'_>, name: &str);
}
