//! PKCE (RFC 7636) verifier and S256 challenge.

use crate::error::OAuth2Result;
use crate::random::generate_url_safe_token;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use std::fmt;

/// 64 random bytes encode to an 86 character verifier, inside the 43..=128
/// range the RFC allows.
const VERIFIER_BYTES: usize = 64;

pub const CHALLENGE_METHOD_S256: &str = "S256";

/// PKCE code challenge and verifier
#[derive(Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: &'static str,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge
    pub fn new() -> OAuth2Result<Self> {
        let code_verifier = generate_url_safe_token(VERIFIER_BYTES)?;
        let code_challenge = code_challenge(&code_verifier);

        Ok(Self {
            code_verifier,
            code_challenge,
            code_challenge_method: CHALLENGE_METHOD_S256,
        })
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .field("code_challenge_method", &self.code_challenge_method)
            .finish()
    }
}

/// `base64url(sha256(verifier))` without padding.
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
