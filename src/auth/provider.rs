// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect provider client
//!
//! The handlers only depend on the [`Provider`] trait: the authorization
//! endpoint used to build the login redirect, the authorization code
//! exchange, and the user info lookup.
//!
//! [`OidcProvider`] implements it over HTTP. Its metadata is fetched once
//! from the discovery document when the gateway starts, every call shares a
//! single [`reqwest::Client`] with explicit connect and total timeouts, and
//! nothing is retried.

use log::debug;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::OidcConfig;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} answered {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("invalid {field} URL {value:?}: {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("issuer mismatch: configured {expected:?}, provider advertises {advertised:?}")]
    IssuerMismatch {
        expected: String,
        advertised: String,
    },

    #[error("provider does not advertise a userinfo endpoint")]
    NoUserInfoEndpoint,
}

/// Subset of the discovery document used by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Identity resolved from the user info endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub email: String,
}

#[derive(Deserialize)]
struct UserInfoClaims {
    #[serde(default)]
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// The OpenID Connect operations the authentication routes need.
#[rocket::async_trait]
pub trait Provider: Send + Sync {
    /// Authorization endpoint the browser is redirected to.
    fn authorization_endpoint(&self) -> &Url;

    /// Exchange an authorization code, with its PKCE verifier if one was sent.
    async fn exchange(&self, code: &str, verifier: Option<&str>)
        -> Result<TokenSet, ProviderError>;

    /// Resolve the identity behind an access token.
    async fn user_info(&self, access_token: &str) -> Result<Identity, ProviderError>;
}

/// [`Provider`] talking to a discovered OpenID Connect issuer.
#[derive(Debug, Clone)]
pub struct OidcProvider {
    client: Client,
    metadata: ProviderMetadata,
    authorization_endpoint: Url,
    token_endpoint: Url,
    userinfo_endpoint: Option<Url>,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl OidcProvider {
    /// Fetch `{issuer}/.well-known/openid-configuration` and build the provider.
    ///
    /// The advertised issuer must equal the configured one, ignoring a
    /// trailing slash.
    pub async fn discover(config: &OidcConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            config.issuer.trim_end_matches('/')
        );
        debug!("Fetching OpenID discovery document from {}", discovery_url);

        let response = client
            .get(&discovery_url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let response = check_status(&discovery_url, response).await?;
        let metadata: ProviderMetadata =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    endpoint: discovery_url.clone(),
                    reason: e.to_string(),
                })?;

        if metadata.issuer.trim_end_matches('/') != config.issuer.trim_end_matches('/') {
            return Err(ProviderError::IssuerMismatch {
                expected: config.issuer.clone(),
                advertised: metadata.issuer,
            });
        }

        let authorization_endpoint =
            parse_endpoint("authorization_endpoint", &metadata.authorization_endpoint)?;
        let token_endpoint = parse_endpoint("token_endpoint", &metadata.token_endpoint)?;
        let userinfo_endpoint = metadata
            .userinfo_endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.is_empty())
            .map(|endpoint| parse_endpoint("userinfo_endpoint", endpoint))
            .transpose()?;

        debug!(
            "Discovered issuer {} (authorize {}, token {})",
            metadata.issuer, authorization_endpoint, token_endpoint
        );

        Ok(Self {
            client,
            metadata,
            authorization_endpoint,
            token_endpoint,
            userinfo_endpoint,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }
}

#[rocket::async_trait]
impl Provider for OidcProvider {
    fn authorization_endpoint(&self) -> &Url {
        &self.authorization_endpoint
    }

    async fn exchange(
        &self,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<TokenSet, ProviderError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(verifier) = verifier {
            form.push(("code_verifier", verifier));
        }

        let endpoint = self.token_endpoint.as_str();
        let response = self
            .client
            .post(self.token_endpoint.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        let response = check_status(endpoint, response).await?;

        let tokens: TokenSet =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
        if tokens.access_token.is_empty() {
            return Err(ProviderError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: "empty access_token".to_string(),
            });
        }
        Ok(tokens)
    }

    async fn user_info(&self, access_token: &str) -> Result<Identity, ProviderError> {
        let endpoint = self
            .userinfo_endpoint
            .as_ref()
            .ok_or(ProviderError::NoUserInfoEndpoint)?;

        let response = self
            .client
            .get(endpoint.clone())
            .header(ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = check_status(endpoint.as_str(), response).await?;

        let claims: UserInfoClaims =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
        if claims.sub.is_empty() {
            return Err(ProviderError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: "missing sub claim".to_string(),
            });
        }

        Ok(Identity {
            subject: claims.sub,
            email: claims.email.unwrap_or_default(),
        })
    }
}

fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, ProviderError> {
    Url::parse(value).map_err(|source| ProviderError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(ProviderError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
