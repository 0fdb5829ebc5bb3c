// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared fixtures: a mocked identity provider, a throwaway website and a
//! gateway instance driven through Rocket's local client.

#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rocket::config::LogLevel;
use rocket::http::Cookie;
use rocket::local::asynchronous::{Client, LocalResponse};
use rust_openid_proxy::auth::OidcProvider;
use rust_openid_proxy::config::Config;
use rust_openid_proxy::gate::Skipper;
use rust_openid_proxy::server::{self, Gateway};
use rust_openid_proxy::session::{SessionStore, SignedCookieStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SECRET: &[u8] = b"integration-test-session-secret";
pub const CLIENT_ID: &str = "client-abc";
pub const REDIRECT_URL: &str = "http://localhost/callback";
pub const AUTH_COOKIE: &str = "openid-proxy-auth";
pub const LOGIN_COOKIE: &str = "openid-proxy-session";
pub const GOOD_CODE: &str = "good-code";
pub const ACCESS_TOKEN: &str = "access-123";
pub const SUB: &str = "abc123";
pub const EMAIL: &str = "mark@wolfe.id.au";
pub const INDEX_HTML: &str = "<h1>protected</h1>";

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Identity provider answering discovery, token and user info requests.
///
/// Only [`GOOD_CODE`] is exchanged for [`ACCESS_TOKEN`], any other code is
/// refused with `invalid_grant`.
pub async fn mock_idp() -> MockServer {
    let server = MockServer::start().await;
    let issuer = server.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{}/authorize", issuer),
            "token_endpoint": format!("{}/token", issuer),
            "userinfo_endpoint": format!("{}/userinfo", issuer),
            "jwks_uri": format!("{}/jwks", issuer),
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("code={}", GOOD_CODE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
        })))
        .with_priority(10)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": SUB,
            "email": EMAIL,
            "email_verified": true,
        })))
        .mount(&server)
        .await;

    server
}

/// Website with an index page, a script and a public asset.
pub fn website() -> TempDir {
    let root = tempfile::tempdir().expect("temp dir");
    fs::write(root.path().join("index.html"), INDEX_HTML).expect("index");
    fs::write(root.path().join("app.js"), "console.log('app');").expect("script");
    fs::create_dir(root.path().join("public")).expect("public dir");
    fs::write(root.path().join("public").join("logo.txt"), "logo").expect("asset");
    root
}

pub fn config(idp: &MockServer, root: &TempDir) -> Config {
    let mut config = Config::default();
    config.oidc.issuer = idp.uri();
    config.oidc.client_id = CLIENT_ID.to_string();
    config.oidc.client_secret = "client-secret".to_string();
    config.oidc.redirect_url = REDIRECT_URL.to_string();
    config.session.secret_key = "SESSION_SECRET".to_string();
    config.content.root = root.path().to_path_buf();
    config
}

pub async fn client(config: Config) -> Client {
    client_with(config, None::<fn(&rocket::Request<'_>) -> bool>).await
}

pub async fn client_with<S: Skipper + 'static>(config: Config, skipper: Option<S>) -> Client {
    let provider = OidcProvider::discover(&config.oidc)
        .await
        .expect("discovery against the mock provider");
    let figment = server::figment(&config)
        .expect("figment")
        .merge(("port", 0))
        .merge(("log_level", LogLevel::Off));

    let mut gateway = Gateway::new(config, Arc::new(provider), SECRET).expect("gateway");
    if let Some(skipper) = skipper {
        gateway = gateway.with_skipper(skipper);
    }

    Client::untracked(gateway.build_rocket(figment))
        .await
        .expect("valid rocket instance")
}

pub fn location(response: &LocalResponse<'_>) -> String {
    response
        .headers()
        .get_one("Location")
        .expect("Location header")
        .to_string()
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = url::Url::parse(url).expect("absolute URL");
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.to_string())
}

/// Cookie set by a response, as the browser would send it back.
pub fn response_cookie(response: &LocalResponse<'_>, name: &str) -> Option<Cookie<'static>> {
    response
        .cookies()
        .get(name)
        .map(|cookie| Cookie::new(name.to_string(), cookie.value().to_string()))
}

/// Whether the response clears the cookie called `name`.
pub fn clears_cookie(response: &LocalResponse<'_>, name: &str) -> bool {
    response
        .cookies()
        .get(name)
        .is_some_and(|cookie| {
            cookie.value().is_empty()
                && cookie.max_age() == Some(rocket::time::Duration::ZERO)
        })
}

/// Values stored in a signed session cookie, read without verification.
pub fn session_values(cookie: &Cookie<'_>) -> Value {
    let (payload, _) = cookie.value().split_once('.').expect("signed value");
    let json = URL_SAFE_NO_PAD.decode(payload).expect("base64url payload");
    let payload: Value = serde_json::from_slice(&json).expect("json payload");
    payload["values"].clone()
}

/// A login session cookie signed with the gateway secret.
pub fn login_cookie(values: Value) -> Cookie<'static> {
    let store = SignedCookieStore::new(SECRET).expect("key");
    let mut session = store.new_session(LOGIN_COOKIE);
    if let Value::Object(values) = values {
        session.values = values;
    }
    let value = store.seal(&session).expect("sealed");
    Cookie::new(LOGIN_COOKIE, value)
}
