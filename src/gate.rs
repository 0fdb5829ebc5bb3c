// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Access gate in front of every mounted route
//!
//! The gate wraps the handler of each route it guards. Before the wrapped
//! handler runs, the request is checked:
//!
//! 1. requests exempted by the [`Skipper`] go straight through
//! 2. requests carrying a valid login session go through unmodified, the
//!    identity is logged
//! 3. anything else is answered with a `302 Found` to `{auth_prefix}/login`
//!
//! Only the presence of the login session is checked, it is not refreshed.

use std::sync::Arc;

use log::{debug, info};
use rocket::response::Redirect;
use rocket::route::{Handler, Outcome};
use rocket::{Data, Request, Route};

use crate::auth::handlers::{EMAIL_KEY, SUB_KEY};
use crate::session::SessionStore;

/// Predicate selecting requests that bypass the gate.
pub trait Skipper: Send + Sync {
    fn skip(&self, request: &Request<'_>) -> bool;
}

impl<F> Skipper for F
where
    F: Fn(&Request<'_>) -> bool + Send + Sync,
{
    fn skip(&self, request: &Request<'_>) -> bool {
        self(request)
    }
}

/// Exempts requests whose path is one of the prefixes or lies below one.
///
/// Matching works on whole decoded segments: `/auth` exempts `/auth` and
/// `/auth/login` but not `/authority`. A path holding a `.` or `..` segment
/// is never exempted, `FileServer` resolves those to files outside the
/// prefix.
#[derive(Debug, Clone, Default)]
pub struct PrefixSkipper {
    prefixes: Vec<Vec<String>>,
}

impl PrefixSkipper {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|prefix| {
                    prefix
                        .into()
                        .split('/')
                        .filter(|segment| !segment.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .collect(),
        }
    }

    /// Whether the decoded `path` is exempted.
    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.matches_segments(&segments)
    }

    /// Whether the decoded path `segments` are exempted.
    pub fn matches_segments(&self, segments: &[&str]) -> bool {
        if segments
            .iter()
            .any(|s| *s == "." || *s == ".." || s.contains(['/', '\\']))
        {
            return false;
        }

        self.prefixes.iter().any(|prefix| {
            prefix.len() <= segments.len()
                && prefix.iter().zip(segments).all(|(p, s)| p == s)
        })
    }
}

impl Skipper for PrefixSkipper {
    fn skip(&self, request: &Request<'_>) -> bool {
        let segments: Vec<&str> = request
            .uri()
            .path()
            .segments()
            .filter(|s| !s.is_empty())
            .collect();
        self.matches_segments(&segments)
    }
}

/// Outcome of the gate check for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Allow { sub: String, email: String },
    Login,
}

/// Checks requests against the login session.
pub struct AccessGate {
    sessions: Arc<dyn SessionStore>,
    login_session: String,
    login_path: String,
    skipper: Box<dyn Skipper>,
}

impl AccessGate {
    /// Gate redirecting to `{auth_prefix}/login`.
    ///
    /// The default skipper exempts `auth_prefix` and `skip_prefixes`.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        login_session: impl Into<String>,
        auth_prefix: &str,
        skip_prefixes: &[String],
    ) -> Self {
        let auth_prefix = auth_prefix.trim_end_matches('/');
        let skipper = PrefixSkipper::new(
            std::iter::once(auth_prefix.to_string()).chain(skip_prefixes.iter().cloned()),
        );

        Self {
            sessions,
            login_session: login_session.into(),
            login_path: format!("{}/login", auth_prefix),
            skipper: Box::new(skipper),
        }
    }

    /// Replace the skip predicate.
    pub fn with_skipper(mut self, skipper: impl Skipper + 'static) -> Self {
        self.skipper = Box::new(skipper);
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn check(&self, request: &Request<'_>) -> Decision {
        if self.skipper.skip(request) {
            return Decision::Skip;
        }

        match self.sessions.get(request.cookies(), &self.login_session) {
            Ok(session) => Decision::Allow {
                sub: session.get_str(SUB_KEY).unwrap_or_default().to_string(),
                email: session.get_str(EMAIL_KEY).unwrap_or_default().to_string(),
            },
            Err(e) => {
                debug!("{} {}: {}", request.method(), request.uri().path(), e);
                Decision::Login
            }
        }
    }

    /// Wrap the handler of every route with this gate.
    pub fn guard(self: &Arc<Self>, routes: Vec<Route>) -> Vec<Route> {
        routes
            .into_iter()
            .map(|mut route| {
                route.handler = Box::new(GatedHandler {
                    inner: route.handler,
                    gate: Arc::clone(self),
                });
                route
            })
            .collect()
    }
}

#[derive(Clone)]
struct GatedHandler {
    inner: Box<dyn Handler>,
    gate: Arc<AccessGate>,
}

#[rocket::async_trait]
impl Handler for GatedHandler {
    async fn handle<'r>(&self, request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r> {
        match self.gate.check(request) {
            Decision::Skip => self.inner.handle(request, data).await,
            Decision::Allow { sub, email } => {
                info!(
                    "{} {} allowed for sub={} email={}",
                    request.method(),
                    request.uri().path(),
                    sub,
                    email
                );
                self.inner.handle(request, data).await
            }
            Decision::Login => Outcome::from(request, Redirect::found(self.gate.login_path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_whole_segments() {
        let skipper = PrefixSkipper::new(["/auth"]);
        assert!(skipper.matches("/auth"));
        assert!(skipper.matches("/auth/"));
        assert!(skipper.matches("/auth/login"));
        assert!(!skipper.matches("/authority"));
        assert!(!skipper.matches("/"));
        assert!(!skipper.matches("/index.html"));
    }

    #[test]
    fn trailing_slash_in_prefix_is_ignored() {
        let skipper = PrefixSkipper::new(["/public/"]);
        assert!(skipper.matches("/public"));
        assert!(skipper.matches("/public/logo.png"));
        assert!(!skipper.matches("/publication"));
    }

    #[test]
    fn root_prefix_matches_everything() {
        let skipper = PrefixSkipper::new(["/"]);
        assert!(skipper.matches("/"));
        assert!(skipper.matches("/anything"));
    }

    #[test]
    fn dot_segments_are_never_exempt() {
        let skipper = PrefixSkipper::new(["/auth"]);
        assert!(!skipper.matches("/auth/../index.html"));
        assert!(!skipper.matches("/auth/./login"));
        assert!(!skipper.matches("/auth/x/.."));
        assert!(!skipper.matches_segments(&["auth", "..", "app.js"]));
        assert!(!skipper.matches_segments(&["auth", "a/b"]));
        assert!(skipper.matches_segments(&["auth", "login"]));
    }

    #[test]
    fn any_prefix_can_match() {
        let skipper = PrefixSkipper::new(vec!["/auth".to_string(), "/health".to_string()]);
        assert!(skipper.matches("/health"));
        assert!(skipper.matches("/auth/callback"));
        assert!(!skipper.matches("/app"));
    }
}
