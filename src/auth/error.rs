// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request path errors of the authentication routes
//!
//! Every failure is logged with its cause on the server side, the browser
//! only receives a status code and the body `failed to process request`.
//!
//! [`GatewayError`] is rendered by its own [`Responder`] rather than by a
//! Rocket catcher. Catchers start from a fresh response and would drop the
//! cookies queued by the handler, in particular the cookie clearing the
//! auth session after a failed callback.

use log::{error, warn};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::Request;
use thiserror::Error;

use super::pkce::EntropyFailure;
use super::provider::ProviderError;
use crate::session::SessionError;

/// Body returned for every failed authentication request.
pub const FAILED_TO_PROCESS: &str = "failed to process request";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("malformed callback request: {0}")]
    MalformedCallback(String),

    #[error(transparent)]
    Entropy(#[from] EntropyFailure),

    #[error("failed to load auth session: {0}")]
    MissingAuthSession(#[source] SessionError),

    #[error("failed to save session: {0}")]
    SessionWrite(#[from] SessionError),

    #[error("auth session has no usable {0:?} value")]
    SessionShape(&'static str),

    #[error("callback state does not match the auth session")]
    StateMismatch,

    #[error("failed to exchange authorization code: {0}")]
    Exchange(#[source] ProviderError),

    #[error("failed to resolve user info: {0}")]
    UserInfo(#[source] ProviderError),

    #[error("no login session")]
    Unauthenticated,

    #[error("login session has no usable {0:?} value")]
    MalformedLoginSession(&'static str),
}

impl GatewayError {
    /// Status code sent to the browser.
    pub fn status(&self) -> Status {
        match self {
            GatewayError::SessionShape(_) | GatewayError::StateMismatch => Status::BadRequest,
            GatewayError::Unauthenticated => Status::Unauthorized,
            _ => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for GatewayError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!(
                "{} {} failed with {}: {}",
                request.method(),
                request.uri().path(),
                status.code,
                self
            );
        } else {
            warn!(
                "{} {} rejected with {}: {}",
                request.method(),
                request.uri().path(),
                status.code,
                self
            );
        }
        (status, FAILED_TO_PROCESS).respond_to(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_bad_requests() {
        assert_eq!(GatewayError::StateMismatch.status(), Status::BadRequest);
        assert_eq!(
            GatewayError::SessionShape("state").status(),
            Status::BadRequest
        );
    }

    #[test]
    fn missing_login_is_unauthorized() {
        assert_eq!(GatewayError::Unauthenticated.status(), Status::Unauthorized);
    }

    #[test]
    fn session_and_upstream_failures_are_server_errors() {
        let missing = GatewayError::MissingAuthSession(SessionError::NotFound("a".into()));
        assert_eq!(missing.status(), Status::InternalServerError);
        assert_eq!(
            GatewayError::MalformedLoginSession("sub").status(),
            Status::InternalServerError
        );
        assert_eq!(
            GatewayError::MalformedCallback("bad".into()).status(),
            Status::InternalServerError
        );
    }
}
