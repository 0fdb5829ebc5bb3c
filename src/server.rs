// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket assembly of the gateway
//!
//! [`Gateway`] wires the configuration, the identity provider and the
//! session signing secret into a Rocket instance:
//!
//! - the authentication routes mounted under `gate.auth_prefix`
//! - the website files from `content.root`, with an optional SPA fallback
//! - the [`AccessGate`] wrapped around all of them
//! - the [`RequestLog`] fairing

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::prelude::*;
use log::{debug, info};
use rocket::config::LogLevel;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::fs::{FileServer, NamedFile};
use rocket::http::uri::Origin;
use rocket::{get, routes, Build, Request, Response, Rocket, Route, State};

use crate::auth::{self, Auth, Provider};
use crate::config::{Config, ServerConfig};
use crate::gate::{AccessGate, Skipper};
use crate::session::{SessionStore, SignedCookieStore};

/// Build the Rocket figment from the server configuration.
///
/// TLS is enabled when both `server.cert` and `server.key` are set.
pub fn figment(config: &Config) -> Result<Figment> {
    let server = &config.server;
    let mut figment = rocket::Config::figment()
        .merge(("ident", server.name.clone()))
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
        .merge(("log_level", LogLevel::Normal));

    if let (Some(cert), Some(key)) = (&server.cert, &server.key) {
        debug!("SSL certificates found in configuration, enabling TLS");

        let cert_data = BASE64_STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
        let key_data = BASE64_STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;

        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));

        info!("TLS enabled for web server");
    }

    Ok(figment)
}

/// One summary line per response, tagged with the deployment identity.
pub struct RequestLog {
    name: String,
    stage: String,
    branch: String,
}

impl From<&ServerConfig> for RequestLog {
    fn from(server: &ServerConfig) -> Self {
        Self {
            name: server.name.clone(),
            stage: server.stage.clone(),
            branch: server.branch.clone(),
        }
    }
}

#[rocket::async_trait]
impl Fairing for RequestLog {
    fn info(&self) -> Info {
        Info {
            name: "Request summary log",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let remote = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        info!(
            "{} {} {} {} app={} stage={} branch={}",
            remote,
            request.method(),
            request.uri().path(),
            response.status().code,
            self.name,
            self.stage,
            self.branch
        );
    }
}

/// Index file served for unknown paths in SPA mode.
struct SpaIndex {
    file: PathBuf,
    auth_prefix: String,
}

#[get("/<_..>", rank = 20)]
async fn spa_fallback(uri: &Origin<'_>, index: &State<SpaIndex>) -> Option<NamedFile> {
    let under_auth = uri
        .path()
        .as_str()
        .strip_prefix(index.auth_prefix.as_str())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if under_auth {
        return None;
    }
    NamedFile::open(&index.file).await.ok()
}

/// The gateway before it is turned into a Rocket instance.
pub struct Gateway {
    config: Config,
    auth: Auth,
    gate: AccessGate,
}

impl Gateway {
    /// Assemble the gateway.
    ///
    /// `secret` signs both session cookies. Fails when the configuration
    /// cannot be served, for example a missing content directory.
    pub fn new(config: Config, provider: Arc<dyn Provider>, secret: &[u8]) -> Result<Self> {
        if !config.content.root.is_dir() {
            anyhow::bail!(
                "Content root {:?} is not a directory",
                config.content.root
            );
        }

        let sessions: Arc<dyn SessionStore> = Arc::new(
            SignedCookieStore::new(secret)
                .context("Failed to create the session store")?
                .with_session(config.session.auth_cookie.clone())
                .with_session(config.session.login_cookie.clone()),
        );

        let auth = Auth::new(&config, provider, sessions.clone())?;
        let gate = AccessGate::new(
            sessions,
            config.session.login_cookie.name.clone(),
            &config.gate.auth_prefix,
            &config.gate.skip_prefixes,
        );

        Ok(Self { config, auth, gate })
    }

    /// Replace the default prefix skipper of the access gate.
    pub fn with_skipper(mut self, skipper: impl Skipper + 'static) -> Self {
        self.gate = self.gate.with_skipper(skipper);
        self
    }

    pub fn build_rocket(self, figment: Figment) -> Rocket<Build> {
        let Gateway { config, auth, gate } = self;
        let gate = Arc::new(gate);
        let auth_prefix = config.gate.auth_prefix.trim_end_matches('/').to_string();

        info!(
            "Serving {:?} behind {} (login at {})",
            config.content.root,
            config.oidc.issuer,
            gate.login_path()
        );

        let content: Vec<Route> = FileServer::from(&config.content.root).into();
        let mut rocket = rocket::custom(figment)
            .attach(RequestLog::from(&config.server))
            .manage(auth)
            .mount(auth_prefix.as_str(), gate.guard(auth::routes()))
            .mount("/", gate.guard(content));

        if config.content.spa {
            rocket = rocket
                .manage(SpaIndex {
                    file: config.content.root.join(&config.content.index),
                    auth_prefix,
                })
                .mount("/", gate.guard(routes![spa_fallback]));
        }

        rocket
    }
}
