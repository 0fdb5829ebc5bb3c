// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_openid_proxy::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

fn assert_rejected_with_sample(contents: &str) -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    // The sample file holds the defaults and loads
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_type_mismatch_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
server:
  port: "not-an-integer"
  address: 12345
oidc:
  pkce: "yes"
"#,
    )
}

#[test]
fn test_port_out_of_range_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
server:
  port: 99999
  address: "127.0.0.1"
"#,
    )
}

#[test]
fn test_unknown_field_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
oidc:
  issuer: "https://accounts.example.com"
  client_sercet: "typo"
"#,
    )
}

#[test]
fn test_unknown_state_store_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
session:
  state_store: redis
"#,
    )
}

#[test]
fn test_pkce_with_cookie_state_store_fails_required_check() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
oidc:
  issuer: "https://accounts.example.com"
  client_id: "proxy"
  client_secret: "secret"
  redirect_url: "https://app.example.com/auth/callback"
  pkce: true
session:
  state_store: cookie
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert!(config.check_required().is_err());
    Ok(())
}

#[test]
fn test_cert_without_key_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
server:
  cert: "Y2VydA=="
"#,
    )
}

#[test]
fn test_strict_auth_cookie_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
session:
  auth_cookie:
    same_site: strict
"#,
    )
}

#[test]
fn test_cookie_state_store_without_pkce_loads() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
oidc:
  pkce: false
session:
  state_store: cookie
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert!(!config.oidc.pkce);
    assert!(!config_path.with_extension("sample.yaml").exists());
    Ok(())
}
