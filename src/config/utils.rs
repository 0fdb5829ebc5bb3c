// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, warn};

use super::Config;
use crate::session::{CookieConfig, SameSitePolicy};

const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Build the draft 2020-12 validator for the embedded configuration schema.
pub fn schema_validator() -> Result<jsonschema::Validator> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let validator = jsonschema::draft202012::options()
        .should_validate_formats(true)
        .build(&schema)?;
    Ok(validator)
}

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./rust_openid_proxy --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **SSL Configuration**: a certificate needs a key and the reverse, both valid base64
/// - **Port Range**: the server port is within 1-65534
/// - **Route prefixes**: `gate.auth_prefix`, `gate.skip_prefixes` and `gate.app_root`
///   are absolute paths, prefixes without a trailing slash
/// - **Cookies**: the two session cookies have distinct, non-empty names and the auth
///   cookie survives the cross-site redirect back from the identity provider
///
/// Required provider values are not checked here, they may still come from
/// the environment. See [`Config::check_required`].
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if let Some(cert) = &config.server.cert {
        if config.server.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }
        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &config.server.key {
        if config.server.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }
        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    if config.server.port < 1 || config.server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.server.port);
    }

    if !is_valid_ip_address(&config.server.address) {
        // Hostnames are accepted, just noted
        debug!(
            "Potentially invalid address format: {}",
            config.server.address
        );
    }

    check_prefix("gate.auth_prefix", &config.gate.auth_prefix)?;
    if config.gate.auth_prefix == "/" {
        anyhow::bail!("gate.auth_prefix cannot be the root path, it would exempt every request");
    }
    for prefix in &config.gate.skip_prefixes {
        check_prefix("gate.skip_prefixes", prefix)?;
    }
    if !config.gate.app_root.starts_with('/') {
        anyhow::bail!(
            "gate.app_root must be an absolute path: {}",
            config.gate.app_root
        );
    }

    let auth = &config.session.auth_cookie;
    let login = &config.session.login_cookie;
    check_cookie("session.auth_cookie", auth)?;
    check_cookie("session.login_cookie", login)?;
    if auth.name == login.name {
        anyhow::bail!("Auth and login cookies share the name {:?}", auth.name);
    }
    if auth.same_site == SameSitePolicy::Strict {
        anyhow::bail!(
            "session.auth_cookie.same_site cannot be strict, the cookie would not be sent back on the provider redirect"
        );
    }

    Ok(())
}

fn check_prefix(field: &str, prefix: &str) -> Result<()> {
    if !prefix.starts_with('/') {
        anyhow::bail!("{} must start with '/': {}", field, prefix);
    }
    if prefix.len() > 1 && prefix.ends_with('/') {
        anyhow::bail!("{} must not end with '/': {}", field, prefix);
    }
    Ok(())
}

fn check_cookie(field: &str, cookie: &CookieConfig) -> Result<()> {
    if cookie.name.is_empty() {
        anyhow::bail!("{}.name cannot be empty", field);
    }
    if cookie.same_site == SameSitePolicy::None && !cookie.secure {
        anyhow::bail!("{} uses same_site: none without secure", field);
    }
    if !cookie.secure {
        warn!("{} is not restricted to HTTPS", field);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn default_config_passes_the_schema() {
        let validator = schema_validator().expect("schema builds");
        let value = serde_json::to_value(Config::default()).expect("serializable");
        assert!(validator.validate(&value).is_ok());
    }

    #[test]
    fn cert_without_key_is_rejected() {
        let mut config = Config::default();
        config.server.cert = Some("Y2VydA==".to_string());
        assert!(validate_specific_rules(&config).is_err());

        config.server.key = Some("a2V5".to_string());
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn prefixes_must_be_absolute_without_trailing_slash() {
        let mut config = Config::default();
        config.gate.auth_prefix = "auth".to_string();
        assert!(validate_specific_rules(&config).is_err());

        config.gate.auth_prefix = "/auth/".to_string();
        assert!(validate_specific_rules(&config).is_err());

        config.gate.auth_prefix = "/".to_string();
        assert!(validate_specific_rules(&config).is_err());

        config.gate.auth_prefix = "/_auth".to_string();
        config.gate.skip_prefixes = vec!["/public".to_string(), "assets".to_string()];
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn cookies_must_be_distinct_and_cross_site_friendly() {
        let mut config = Config::default();
        config.session.auth_cookie.name = config.session.login_cookie.name.clone();
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.session.auth_cookie.same_site = SameSitePolicy::Strict;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.session.login_cookie.same_site = SameSitePolicy::None;
        config.session.login_cookie.secure = false;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn address_helper_accepts_special_values() {
        assert!(is_valid_ip_address("0.0.0.0"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("gateway.internal"));
    }
}
