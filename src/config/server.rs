// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP listener and deployment identity settings

use serde::{Deserialize, Serialize};

/// Configuration for the gateway HTTP server.
///
/// `name`, `stage` and `branch` identify the deployment. They are added to
/// every request summary log line so that several gateways can share one
/// log sink.
///
/// # TLS Configuration
///
/// For HTTPS, both `cert` and `key` must be provided as Base64-encoded PEM
/// files. If either is missing the server listens in plain HTTP, which is
/// the expected setup behind a TLS terminating load balancer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// The TCP port the gateway will listen on.
    ///
    /// Valid range is 1-65534. Default value is 8080.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the server will bind to.
    ///
    /// Default is "127.0.0.1". Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    /// Application name, reported as the Rocket ident and in request logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Deployment stage, for example `dev` or `prod`.
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Source branch of the deployed content.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// SSL/TLS certificate in PEM format, Base64 encoded.
    #[serde(default)]
    pub cert: Option<String>,

    /// SSL/TLS private key in PEM format, Base64 encoded.
    #[serde(default)]
    pub key: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    "openid-proxy".to_string()
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
            stage: default_stage(),
            branch: default_branch(),
            cert: None,
            key: None,
        }
    }
}
