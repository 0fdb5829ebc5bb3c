// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the OpenID Connect authentication gateway
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rust_openid_proxy::auth::OidcProvider;
use rust_openid_proxy::config::{self, Config, ConfigOverrides};
use rust_openid_proxy::secrets::{load_session_secret, secret_cache};
use rust_openid_proxy::server::{self, Gateway};

/// OpenID Connect authentication gateway for static websites
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML), created with defaults when missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Address to bind to
    #[arg(short, long)]
    address: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// OpenID Connect issuer URL
    #[arg(long, env = "ISSUER")]
    issuer: Option<String>,

    /// OAuth2 client identifier
    #[arg(long, env = "CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth2 client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Callback URL registered with the provider
    #[arg(long, env = "REDIRECT_URL")]
    redirect_url: Option<String>,

    /// Environment variable or file holding the session signing secret
    #[arg(long, env = "SESSION_SECRET_KEY")]
    session_secret_key: Option<String>,

    /// Directory of the website to protect
    #[arg(long, env = "WEBSITE_ROOT")]
    website_root: Option<PathBuf>,

    /// Application name used in logs
    #[arg(long, env = "APP_NAME")]
    app_name: Option<String>,

    /// Deployment stage used in logs
    #[arg(long, env = "STAGE")]
    stage: Option<String>,

    /// Deployed branch used in logs
    #[arg(long, env = "BRANCH")]
    branch: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            address: self.address.clone(),
            port: self.port,
            app_name: self.app_name.clone(),
            stage: self.stage.clone(),
            branch: self.branch.clone(),
            issuer: self.issuer.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_url: self.redirect_url.clone(),
            session_secret_key: self.session_secret_key.clone(),
            website_root: self.website_root.clone(),
        }
    }
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.show_config_schema {
        config::output_config_schema()?;
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_args(args.overrides());
    config::utils::validate_specific_rules(&config)?;
    config.check_required()?;

    let secret = load_session_secret(
        secret_cache(config.session.secret_source).as_ref(),
        &config.session.secret_key,
    )
    .context("Failed to load the session signing secret")?;

    let provider = OidcProvider::discover(&config.oidc)
        .await
        .with_context(|| format!("OpenID discovery failed for {}", config.oidc.issuer))?;
    let metadata = provider.metadata();
    info!(
        "Using provider {} (authorize {}, token {}, userinfo {})",
        metadata.issuer,
        metadata.authorization_endpoint,
        metadata.token_endpoint,
        metadata.userinfo_endpoint.as_deref().unwrap_or("none")
    );

    info!(
        "Starting {} ({} / {}) on {}:{}",
        config.server.name,
        config.server.stage,
        config.server.branch,
        config.server.address,
        config.server.port
    );

    let figment = server::figment(&config)?;
    let rocket = Gateway::new(config, Arc::new(provider), secret.as_bytes())?.build_rocket(figment);
    let _rocket = rocket.launch().await?;

    Ok(())
}
