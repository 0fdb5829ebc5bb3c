// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust OpenID proxy library
//!
//! An authentication gateway placed in front of a static website. Browsers
//! are sent through an external OpenID Connect provider before they are
//! served anything, the resulting identity is kept in a signed cookie.

pub mod auth;
pub mod config;
pub mod gate;
pub mod secrets;
pub mod server;
pub mod session;
