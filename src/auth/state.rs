// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Anti-forgery state kept between the login redirect and the callback

use std::sync::Arc;

use log::debug;
use rocket::http::CookieJar;

use super::error::GatewayError;
use super::pkce::{new_verifier, random_state, EntropyFailure, TOKEN_LENGTH};
use crate::session::{CookieConfig, SessionError, SessionStore};

/// Auth session key holding the state token.
pub const STATE_KEY: &str = "state";
/// Auth session key holding the PKCE code verifier.
pub const VERIFIER_KEY: &str = "verifier";

/// Values minted by a login and checked by the matching callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub state: String,
    pub verifier: Option<String>,
}

impl LoginAttempt {
    /// Mint a fresh state token, and a PKCE verifier when `pkce` is set.
    pub fn generate(pkce: bool) -> Result<Self, EntropyFailure> {
        let state = random_state(TOKEN_LENGTH)?;
        let verifier = if pkce {
            Some(new_verifier(TOKEN_LENGTH)?)
        } else {
            None
        };
        Ok(Self { state, verifier })
    }
}

/// Short-lived storage of a [`LoginAttempt`].
///
/// Both variants are single use: [`StateStore::consume`] queues the removal
/// of the stored attempt as soon as it has been read.
#[derive(Clone)]
pub enum StateStore {
    /// The bare state token in an unsigned cookie. No room for a verifier.
    Cookie(CookieConfig),
    /// A signed session holding the state token and the verifier.
    Session {
        sessions: Arc<dyn SessionStore>,
        name: String,
    },
}

impl StateStore {
    /// Whether the store can keep a PKCE verifier.
    pub fn carries_verifier(&self) -> bool {
        matches!(self, StateStore::Session { .. })
    }

    /// Persist `attempt` in the response cookies.
    pub fn begin(&self, jar: &CookieJar<'_>, attempt: &LoginAttempt) -> Result<(), GatewayError> {
        match self {
            StateStore::Cookie(config) => {
                jar.add(config.cookie(&config.name, attempt.state.clone()));
            }
            StateStore::Session { sessions, name } => {
                let mut session = sessions.new_session(name);
                session.insert(STATE_KEY, attempt.state.as_str());
                if let Some(verifier) = &attempt.verifier {
                    session.insert(VERIFIER_KEY, verifier.as_str());
                }
                sessions.save(jar, &session)?;
            }
        }
        Ok(())
    }

    /// Read back the attempt sent by the browser and queue its removal.
    ///
    /// A missing attempt is a server error: the browser reached the callback
    /// without a login in progress, or replayed a consumed one. An attempt
    /// lacking the expected values is a bad request.
    pub fn consume(
        &self,
        jar: &CookieJar<'_>,
        expect_verifier: bool,
    ) -> Result<LoginAttempt, GatewayError> {
        match self {
            StateStore::Cookie(config) => {
                let state = jar
                    .get(&config.name)
                    .map(|cookie| cookie.value().to_string())
                    .ok_or_else(|| {
                        GatewayError::MissingAuthSession(SessionError::NotFound(
                            config.name.clone(),
                        ))
                    })?;
                jar.add(config.removal(&config.name));

                if expect_verifier {
                    return Err(GatewayError::SessionShape(VERIFIER_KEY));
                }
                Ok(LoginAttempt {
                    state,
                    verifier: None,
                })
            }
            StateStore::Session { sessions, name } => {
                let session = sessions
                    .get(jar, name)
                    .map_err(GatewayError::MissingAuthSession)?;
                sessions.destroy(jar, name);
                debug!("Consumed {:?} auth session", name);

                let state = session
                    .get_str(STATE_KEY)
                    .ok_or(GatewayError::SessionShape(STATE_KEY))?
                    .to_string();
                let verifier = if expect_verifier {
                    let verifier = session
                        .get_str(VERIFIER_KEY)
                        .ok_or(GatewayError::SessionShape(VERIFIER_KEY))?;
                    Some(verifier.to_string())
                } else {
                    None
                };
                Ok(LoginAttempt { state, verifier })
            }
        }
    }
}

/// Compare the `state` echoed by the provider with the stored one.
///
/// An empty callback state never matches, even against an empty stored state.
pub fn state_matches(callback: &str, stored: &str) -> bool {
    !callback.is_empty() && callback == stored
}
