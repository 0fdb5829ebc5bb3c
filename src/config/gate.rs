// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Access gate and content origin settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration of the access gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Mount point of the login, callback, userinfo and logout routes.
    ///
    /// Always exempt from the gate. Default is `/auth`.
    #[serde(default = "default_auth_prefix")]
    pub auth_prefix: String,

    /// Additional path prefixes served without a login session.
    ///
    /// Matching is done on whole path segments: `/public` exempts `/public`
    /// and `/public/logo.png` but not `/publication`.
    #[serde(default)]
    pub skip_prefixes: Vec<String>,

    /// Where the browser is sent after a successful login.
    #[serde(default = "default_app_root")]
    pub app_root: String,
}

fn default_auth_prefix() -> String {
    "/auth".to_string()
}

fn default_app_root() -> String {
    "/".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            auth_prefix: default_auth_prefix(),
            skip_prefixes: Vec::new(),
            app_root: default_app_root(),
        }
    }
}

/// Configuration of the static content served behind the gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentConfig {
    /// Directory holding the website files.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// File served for `/` and, in SPA mode, for unknown paths.
    #[serde(default = "default_index")]
    pub index: String,

    /// Serve `index` for every unmatched GET request.
    #[serde(default = "default_spa")]
    pub spa: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_index() -> String {
    "index.html".to_string()
}

fn default_spa() -> bool {
    true
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            index: default_index(),
            spa: default_spa(),
        }
    }
}
