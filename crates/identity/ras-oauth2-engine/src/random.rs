//! Secure random tokens and constant-time comparison.

use crate::error::{OAuth2Error, OAuth2Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

/// Byte length used for `state` and `nonce` values.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generate `byte_len` bytes from the operating system CSPRNG and encode them
/// as unpadded base64url.
///
/// `OsRng` holds no state of its own, so concurrent callers never share
/// output.
pub fn generate_url_safe_token(byte_len: usize) -> OAuth2Result<String> {
    if byte_len == 0 {
        return Err(OAuth2Error::config("token length must be non-zero"));
    }

    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| OAuth2Error::EntropyUnavailable(e.to_string()))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compare two secrets without short-circuiting on the first differing byte.
pub fn secure_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
