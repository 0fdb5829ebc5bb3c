// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-openid-proxy project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PKCE verifier/challenge derivation and random CSRF state tokens
//!
//! Every token produced here is unpadded base64url, so `n` random bytes
//! encode to `ceil(4n / 3)` characters (43 characters for 32 bytes).
//!
//! Only the `S256` challenge method is supported.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of random bytes used for state tokens and PKCE verifiers.
pub const TOKEN_LENGTH: usize = 32;

/// The only code challenge method this gateway sends.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// The operating system entropy source could not be read.
///
/// Handed back to the request that asked for a token so that a single
/// failure turns into a 500 instead of taking the whole gateway down.
#[derive(Debug, Error)]
#[error("failed to read secure random bytes: {0}")]
pub struct EntropyFailure(String);

/// Generate and encode a new PKCE code verifier from `len` random bytes.
pub fn new_verifier(len: usize) -> Result<String, EntropyFailure> {
    random_bytes(len).map(|bytes| encode(&bytes))
}

/// Derive the `S256` code challenge of an already encoded verifier.
pub fn code_challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    encode(&digest)
}

/// Generate the random anti-forgery `state` value sent to the identity provider.
pub fn random_state(len: usize) -> Result<String, EntropyFailure> {
    random_bytes(len).map(|bytes| encode(&bytes))
}

fn random_bytes(len: usize) -> Result<Vec<u8>, EntropyFailure> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EntropyFailure(e.to_string()))?;
    Ok(bytes)
}

fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
