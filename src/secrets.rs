// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Startup secret retrieval
//!
//! The session signing secret is read once when the gateway starts, through
//! the [`SecretCache`] capability. Two backends are provided: environment
//! variables and files (for example a mounted Kubernetes or Docker secret).

use std::fs;
use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use crate::config::SecretSource;

/// Errors raised while reading a secret.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {0:?} is not set")]
    NotFound(String),

    #[error("failed to read secret file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret {0:?} is empty")]
    Empty(String),
}

/// Read access to named secrets.
#[cfg_attr(test, mockall::automock)]
pub trait SecretCache: Send + Sync {
    /// Return the secret stored under `key`.
    fn get_value(&self, key: &str) -> Result<String, SecretError>;
}

/// Secrets held in environment variables, `key` is the variable name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretCache;

impl SecretCache for EnvSecretCache {
    fn get_value(&self, key: &str) -> Result<String, SecretError> {
        std::env::var(key).map_err(|_| SecretError::NotFound(key.to_string()))
    }
}

/// Secrets held in files, `key` is the file path.
///
/// Trailing line breaks are removed, most tools writing secret files add one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSecretCache;

impl SecretCache for FileSecretCache {
    fn get_value(&self, key: &str) -> Result<String, SecretError> {
        let path = PathBuf::from(key);
        let contents = fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => SecretError::NotFound(key.to_string()),
            _ => SecretError::Io { path, source },
        })?;
        Ok(contents.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Backend matching the configured secret source.
pub fn secret_cache(source: SecretSource) -> Box<dyn SecretCache> {
    match source {
        SecretSource::Env => Box::new(EnvSecretCache),
        SecretSource::File => Box::new(FileSecretCache),
    }
}

/// Read the session signing secret. An empty value is refused.
pub fn load_session_secret(cache: &dyn SecretCache, key: &str) -> Result<String, SecretError> {
    debug!("Loading session signing secret from {:?}", key);
    let secret = cache.get_value(key)?;
    if secret.is_empty() {
        return Err(SecretError::Empty(key.to_string()));
    }
    Ok(secret)
}
