// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the OpenID proxy
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the gateway. The configuration is backed by a
//! YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The application's configuration is organized as a nested structure with sections:
//! - `server`: listener address, TLS material and deployment identity
//! - `oidc`: identity provider and OAuth2 client settings
//! - `session`: signing secret, state store and cookie attributes
//! - `gate`: auth route prefix, exempt prefixes and post-login landing page
//! - `content`: static website directory
//!
//! ## Usage
//!
//! ```no_run
//! use rust_openid_proxy::config::{Config, ConfigOverrides};
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(ConfigOverrides {
//!     issuer: Some("https://accounts.example.com".to_string()),
//!     port: Some(8081),
//!     ..Default::default()
//! });
//!
//! // Refuse to start without provider credentials
//! config.check_required().unwrap();
//! ```

pub mod gate;
pub mod oidc;
pub mod server;
pub mod session;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export all types for public API
pub use gate::{ContentConfig, GateConfig};
pub use oidc::OidcConfig;
pub use server::ServerConfig;
pub use session::{SecretSource, SessionConfig, StateStoreKind};
pub use utils::{is_valid_ip_address, output_config_schema};

/// Configuration that cannot be used to start the gateway.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure for the gateway.
///
/// # Default Values
///
/// Each section uses default values when not explicitly specified in the
/// configuration file. The provider credentials have no meaningful default
/// and must come from the file, the command line or the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub oidc: OidcConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub content: ContentConfig,
}

/// Values taken from the command line or the environment.
///
/// `None` keeps the value loaded from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub app_name: Option<String>,
    pub stage: Option<String>,
    pub branch: Option<String>,
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_url: Option<String>,
    pub session_secret_key: Option<String>,
    pub website_root: Option<PathBuf>,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default values. A file failing
    /// schema validation, deserialization or [`utils::validate_specific_rules`]
    /// is rejected and a `*.sample.yaml` file with defaults is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let validator = utils::schema_validator()?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only the values present in `overrides` replace the loaded configuration.
    pub fn apply_args(&mut self, overrides: ConfigOverrides) {
        if let Some(address) = overrides.address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }
        if let Some(port) = overrides.port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }
        if let Some(name) = overrides.app_name {
            debug!("Overriding application name from command line: {}", name);
            self.server.name = name;
        }
        if let Some(stage) = overrides.stage {
            debug!("Overriding stage from command line: {}", stage);
            self.server.stage = stage;
        }
        if let Some(branch) = overrides.branch {
            debug!("Overriding branch from command line: {}", branch);
            self.server.branch = branch;
        }

        if let Some(issuer) = overrides.issuer {
            debug!("Overriding issuer from command line: {}", issuer);
            self.oidc.issuer = issuer;
        }
        if let Some(client_id) = overrides.client_id {
            debug!("Overriding client id from command line: {}", client_id);
            self.oidc.client_id = client_id;
        }
        if let Some(secret) = overrides.client_secret {
            debug!("Overriding client secret from command line");
            self.oidc.client_secret = secret;
        }
        if let Some(redirect_url) = overrides.redirect_url {
            debug!("Overriding redirect URL from command line: {}", redirect_url);
            self.oidc.redirect_url = redirect_url;
        }

        if let Some(key) = overrides.session_secret_key {
            debug!("Overriding session secret key from command line: {}", key);
            self.session.secret_key = key;
        }
        if let Some(root) = overrides.website_root {
            debug!("Overriding website root from command line: {:?}", root);
            self.content.root = root;
        }
    }

    /// Check the values the gateway cannot start without.
    ///
    /// Runs after [`Config::apply_args`], since the provider credentials are
    /// usually supplied through the environment rather than the file.
    pub fn check_required(&self) -> Result<(), ConfigError> {
        let required = [
            ("oidc.issuer", &self.oidc.issuer),
            ("oidc.client_id", &self.oidc.client_id),
            ("oidc.client_secret", &self.oidc.client_secret),
            ("oidc.redirect_url", &self.oidc.redirect_url),
            ("session.secret_key", &self.session.secret_key),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        url::Url::parse(&self.oidc.issuer)
            .map_err(|e| ConfigError::Invalid(format!("oidc.issuer is not a URL: {}", e)))?;
        url::Url::parse(&self.oidc.redirect_url)
            .map_err(|e| ConfigError::Invalid(format!("oidc.redirect_url is not a URL: {}", e)))?;

        if self.oidc.pkce && self.session.state_store == StateStoreKind::Cookie {
            return Err(ConfigError::Invalid(
                "oidc.pkce requires session.state_store: session".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        let mut config = Config::default();
        config.apply_args(ConfigOverrides {
            issuer: Some("https://idp.example.com".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            redirect_url: Some("https://app.example.com/auth/callback".to_string()),
            ..Default::default()
        });
        config
    }

    #[test]
    fn complete_config_passes() {
        assert_eq!(complete().check_required(), Ok(()));
    }

    #[test]
    fn each_required_value_is_enforced() {
        let mut config = complete();
        config.oidc.issuer.clear();
        assert_eq!(config.check_required(), Err(ConfigError::Missing("oidc.issuer")));

        let mut config = complete();
        config.oidc.client_id = "  ".to_string();
        assert_eq!(
            config.check_required(),
            Err(ConfigError::Missing("oidc.client_id"))
        );

        let mut config = complete();
        config.oidc.client_secret.clear();
        assert_eq!(
            config.check_required(),
            Err(ConfigError::Missing("oidc.client_secret"))
        );

        let mut config = complete();
        config.oidc.redirect_url.clear();
        assert_eq!(
            config.check_required(),
            Err(ConfigError::Missing("oidc.redirect_url"))
        );

        let mut config = complete();
        config.session.secret_key.clear();
        assert_eq!(
            config.check_required(),
            Err(ConfigError::Missing("session.secret_key"))
        );
    }

    #[test]
    fn pkce_with_cookie_state_store_is_invalid() {
        let mut config = complete();
        config.session.state_store = StateStoreKind::Cookie;
        assert!(matches!(
            config.check_required(),
            Err(ConfigError::Invalid(_))
        ));

        config.oidc.pkce = false;
        assert_eq!(config.check_required(), Ok(()));
    }

    #[test]
    fn relative_redirect_url_is_invalid() {
        let mut config = complete();
        config.oidc.redirect_url = "/auth/callback".to_string();
        assert!(matches!(
            config.check_required(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn overrides_only_replace_given_values() {
        let mut config = Config::default();
        config.apply_args(ConfigOverrides {
            port: Some(9000),
            stage: Some("prod".to_string()),
            website_root: Some(PathBuf::from("/srv/www")),
            ..Default::default()
        });

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.stage, "prod");
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.content.root, PathBuf::from("/srv/www"));
        assert_eq!(config.gate.auth_prefix, "/auth");
    }
}
