// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use log::{debug, info};
use rocket::form::{self, FromForm};
use rocket::http::{CookieJar, Status};
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{get, routes, Route, State};
use serde::{Deserialize, Serialize};

use super::error::GatewayError;
use super::pkce::{code_challenge_s256, CODE_CHALLENGE_METHOD};
use super::provider::Provider;
use super::state::{state_matches, LoginAttempt, StateStore};
use crate::config::{Config, ConfigError, StateStoreKind};
use crate::session::SessionStore;

/// Login session key holding the subject identifier.
pub const SUB_KEY: &str = "sub";
/// Login session key holding the email address.
pub const EMAIL_KEY: &str = "email";

/// Query string of the provider redirect back to the gateway.
#[derive(Debug, Default, FromForm)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Body of `GET {prefix}/userinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub sub: String,
    pub email: String,
}

/// Shared state of the authentication routes, managed by Rocket.
pub struct Auth {
    provider: Arc<dyn Provider>,
    sessions: Arc<dyn SessionStore>,
    state_store: StateStore,
    client_id: String,
    redirect_url: String,
    scopes: Vec<String>,
    pkce: bool,
    app_root: String,
    login_session: String,
}

impl Auth {
    pub fn new(
        config: &Config,
        provider: Arc<dyn Provider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ConfigError> {
        let state_store = match config.session.state_store {
            StateStoreKind::Cookie => StateStore::Cookie(config.session.auth_cookie.clone()),
            StateStoreKind::Session => StateStore::Session {
                sessions: sessions.clone(),
                name: config.session.auth_cookie.name.clone(),
            },
        };
        if config.oidc.pkce && !state_store.carries_verifier() {
            return Err(ConfigError::Invalid(
                "oidc.pkce requires session.state_store: session".to_string(),
            ));
        }

        Ok(Self {
            provider,
            sessions,
            state_store,
            client_id: config.oidc.client_id.clone(),
            redirect_url: config.oidc.redirect_url.clone(),
            scopes: config.oidc.scopes.clone(),
            pkce: config.oidc.pkce,
            app_root: config.gate.app_root.clone(),
            login_session: config.session.login_cookie.name.clone(),
        })
    }

    /// Start a login: persist a fresh attempt and redirect to the provider.
    pub fn begin_login(&self, jar: &CookieJar<'_>) -> Result<Redirect, GatewayError> {
        let attempt = LoginAttempt::generate(self.pkce)?;
        self.state_store.begin(jar, &attempt)?;

        let url = self.authorization_url(&attempt);
        debug!("Redirecting to identity provider: {}", url);
        Ok(Redirect::found(url))
    }

    /// Authorization request URL, parameters in lexical key order.
    pub fn authorization_url(&self, attempt: &LoginAttempt) -> String {
        let mut url = self.provider.authorization_endpoint().clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("access_type", "offline")
                .append_pair("client_id", &self.client_id);
            if let Some(verifier) = &attempt.verifier {
                query
                    .append_pair("code_challenge", &code_challenge_s256(verifier))
                    .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
            }
            query
                .append_pair("redirect_uri", &self.redirect_url)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("state", &attempt.state);
        }
        url.into()
    }

    /// Complete a login from the provider callback.
    ///
    /// The auth session is consumed before anything else is checked, so a
    /// callback URL can be used at most once whatever its outcome.
    pub async fn finish_login(
        &self,
        jar: &CookieJar<'_>,
        params: CallbackParams,
    ) -> Result<Redirect, GatewayError> {
        let attempt = self.state_store.consume(jar, self.pkce)?;

        let state = params.state.unwrap_or_default();
        if !state_matches(&state, &attempt.state) {
            return Err(GatewayError::StateMismatch);
        }

        let code = params.code.unwrap_or_default();
        let tokens = self
            .provider
            .exchange(&code, attempt.verifier.as_deref())
            .await
            .map_err(GatewayError::Exchange)?;

        let identity = self
            .provider
            .user_info(&tokens.access_token)
            .await
            .map_err(GatewayError::UserInfo)?;

        let mut session = self.sessions.new_session(&self.login_session);
        session.insert(EMAIL_KEY, identity.email.as_str());
        session.insert(SUB_KEY, identity.subject.as_str());
        self.sessions.save(jar, &session)?;

        info!(
            "Login completed for sub={} email={}",
            identity.subject, identity.email
        );
        Ok(Redirect::found(self.app_root.clone()))
    }

    /// Identity stored in the login session.
    pub fn current_user(&self, jar: &CookieJar<'_>) -> Result<UserInfoResponse, GatewayError> {
        let session = self
            .sessions
            .get(jar, &self.login_session)
            .map_err(|_| GatewayError::Unauthenticated)?;

        let sub = session
            .get_str(SUB_KEY)
            .ok_or(GatewayError::MalformedLoginSession(SUB_KEY))?;
        let email = session
            .get_str(EMAIL_KEY)
            .ok_or(GatewayError::MalformedLoginSession(EMAIL_KEY))?;

        Ok(UserInfoResponse {
            sub: sub.to_string(),
            email: email.to_string(),
        })
    }

    /// Clear the login session, whether or not there is one.
    pub fn logout(&self, jar: &CookieJar<'_>) {
        self.sessions.destroy(jar, &self.login_session);
    }
}

#[get("/login")]
pub fn login(auth: &State<Auth>, jar: &CookieJar<'_>) -> Result<Redirect, GatewayError> {
    auth.begin_login(jar)
}

#[get("/callback?<params..>")]
pub async fn callback(
    auth: &State<Auth>,
    jar: &CookieJar<'_>,
    params: form::Result<'_, CallbackParams>,
) -> Result<Redirect, GatewayError> {
    let params = params.map_err(|errors| GatewayError::MalformedCallback(errors.to_string()))?;
    auth.finish_login(jar, params).await
}

#[get("/userinfo")]
pub fn userinfo(
    auth: &State<Auth>,
    jar: &CookieJar<'_>,
) -> Result<Json<UserInfoResponse>, GatewayError> {
    auth.current_user(jar).map(Json)
}

#[get("/logout")]
pub fn logout(auth: &State<Auth>, jar: &CookieJar<'_>) -> Status {
    auth.logout(jar);
    Status::Ok
}

/// Routes to mount under the auth prefix.
pub fn routes() -> Vec<Route> {
    routes![login, callback, userinfo, logout]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::{Identity, ProviderError, TokenSet};
    use crate::session::SignedCookieStore;
    use url::Url;

    struct StaticProvider(Url);

    #[rocket::async_trait]
    impl Provider for StaticProvider {
        fn authorization_endpoint(&self) -> &Url {
            &self.0
        }

        async fn exchange(
            &self,
            _code: &str,
            _verifier: Option<&str>,
        ) -> Result<TokenSet, ProviderError> {
            unreachable!("not used by these tests")
        }

        async fn user_info(&self, _access_token: &str) -> Result<Identity, ProviderError> {
            unreachable!("not used by these tests")
        }
    }

    fn auth(pkce: bool) -> Auth {
        let mut config = Config::default();
        config.oidc.client_id = "client-abc".to_string();
        config.oidc.redirect_url = "http://localhost/callback".to_string();
        config.oidc.pkce = pkce;

        let provider = StaticProvider(
            Url::parse("https://idp.example.com/oauth2/authorize").expect("url"),
        );
        let sessions = SignedCookieStore::new(b"unit-test-key").expect("key");
        Auth::new(&config, Arc::new(provider), Arc::new(sessions)).expect("valid config")
    }

    fn attempt(verifier: Option<&str>) -> LoginAttempt {
        LoginAttempt {
            state: "xyz".to_string(),
            verifier: verifier.map(str::to_string),
        }
    }

    #[test]
    fn authorization_url_keeps_parameter_order() {
        let url = auth(false).authorization_url(&attempt(None));

        assert_eq!(
            url,
            "https://idp.example.com/oauth2/authorize?access_type=offline&client_id=client-abc\
             &redirect_uri=http%3A%2F%2Flocalhost%2Fcallback&response_type=code\
             &scope=email+openid&state=xyz"
        );
    }

    #[test]
    fn authorization_url_carries_the_pkce_challenge() {
        let verifier = "GFRtrRUMZiEcFWlhW-3KxV4bBaQbj4T4pSCc_LjOuiE";
        let url = auth(true).authorization_url(&attempt(Some(verifier)));

        assert!(url.contains(
            "&code_challenge=KE-6gOh8H3HJ6cS28ZWoAWnHUFisTbK81AfSi6EP2gk&code_challenge_method=S256&"
        ));
        assert!(!url.contains(verifier));
    }

    #[test]
    fn cookie_state_store_refuses_pkce() {
        let mut config = Config::default();
        config.session.state_store = StateStoreKind::Cookie;
        config.oidc.pkce = true;

        let provider = StaticProvider(Url::parse("https://idp.example.com/auth").expect("url"));
        let sessions = SignedCookieStore::new(b"unit-test-key").expect("key");
        assert!(Auth::new(&config, Arc::new(provider), Arc::new(sessions)).is_err());
    }
}
