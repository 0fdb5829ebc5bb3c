// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect login for the gateway
//!
//! This module drives the OAuth2 authorization code flow against an external
//! identity provider and exposes four routes, mounted under the configured
//! auth prefix (`/auth` by default):
//!
//! - `GET /login` - mints a state token (and a PKCE verifier), keeps them in
//!   the short-lived auth session and redirects to the provider
//! - `GET /callback?code=&state=` - checks the state, exchanges the code,
//!   resolves the identity and writes the long-lived login session
//! - `GET /userinfo` - returns `{"sub", "email"}` from the login session
//! - `GET /logout` - clears the login session
//!
//! Failures answer a bare status with the body `failed to process request`,
//! the cause is only logged. See [`GatewayError`].

pub mod error;
pub mod handlers;
pub mod pkce;
pub mod provider;
pub mod state;

pub use error::{GatewayError, FAILED_TO_PROCESS};
pub use handlers::{routes, Auth, CallbackParams, UserInfoResponse};
pub use provider::{Identity, OidcProvider, Provider, ProviderError, TokenSet};
pub use state::{LoginAttempt, StateStore};
