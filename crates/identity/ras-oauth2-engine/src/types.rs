//! OAuth2 protocol and flow types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One in-flight login, created by `build_login_url` and consumed by the
/// matching exchange.
///
/// The caller keeps this value (usually in its session store) between the
/// redirect and the callback. It is deliberately not `Clone`: passing it to
/// the exchange by value consumes it.
#[derive(Serialize, Deserialize)]
pub struct AuthorizationAttempt {
    pub state: String,
    pub nonce: String,
    pub code_verifier: Option<String>,
    pub code_challenge: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for AuthorizationAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationAttempt")
            .field("state", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .field("code_verifier", &self.code_verifier.as_ref().map(|_| "[REDACTED]"))
            .field("code_challenge", &self.code_challenge)
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    #[serde(default)]
    pub code: String,
    pub state: String,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Token set held by the caller after a successful exchange or refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub issued_at: DateTime<Utc>,
    /// `None` when the provider did not declare a lifetime. Unknown, not
    /// infinite.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenResponse {
    /// `None` when the expiry is unknown.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Option<bool> {
        self.expires_at.map(|expires_at| now >= expires_at)
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint success body as sent on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<ExpiresIn>,
    pub refresh_token: Option<String>,
    pub scope: Option<GrantedScope>,
    pub id_token: Option<String>,
}

/// `expires_in` as providers actually send it: integer, float or string.
/// Anything else is kept so the token itself is not lost.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ExpiresIn {
    Seconds(i64),
    Unsigned(u64),
    Fractional(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ExpiresIn {
    /// Lifetime in whole seconds; `None` when unusable.
    pub fn seconds(&self) -> Option<i64> {
        match self {
            ExpiresIn::Seconds(s) => Some(*s),
            ExpiresIn::Unsigned(s) => i64::try_from(*s).ok(),
            ExpiresIn::Fractional(f) => whole_seconds(*f),
            ExpiresIn::Text(s) => {
                let s = s.trim();
                s.parse()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_seconds))
            }
            ExpiresIn::Other(value) => value.as_f64().and_then(whole_seconds),
        }
    }
}

fn whole_seconds(value: f64) -> Option<i64> {
    (value.is_finite() && value.abs() < i64::MAX as f64).then(|| value.trunc() as i64)
}

/// Granted scope: RFC 6749 says space-delimited string, some providers send a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum GrantedScope {
    Delimited(String),
    List(Vec<String>),
}

impl GrantedScope {
    pub fn into_string(self) -> String {
        match self {
            GrantedScope::Delimited(s) => s,
            GrantedScope::List(items) => items.join(" "),
        }
    }
}

/// RFC 6749 §5.2 error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// Avatar locations in three sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

/// Provider-independent user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub provider_name: String,
    pub avatar_uris: AvatarUris,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn raw_token_response_accepts_string_lifetime() {
        let raw: RawTokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "token_type": "Bearer", "expires_in": "3599"}"#,
        )
        .unwrap();
        assert_eq!(raw.expires_in.and_then(|e| e.seconds()), Some(3599));
    }

    #[test]
    fn raw_token_response_tolerates_odd_lifetimes() {
        let parse = |body: &str| {
            serde_json::from_str::<RawTokenResponse>(body)
                .unwrap()
                .expires_in
                .and_then(|e| e.seconds())
        };
        assert_eq!(parse(r#"{"access_token": "a", "expires_in": 3599.0}"#), Some(3599));
        assert_eq!(parse(r#"{"access_token": "a", "expires_in": "3599.7"}"#), Some(3599));
        assert_eq!(parse(r#"{"access_token": "a", "expires_in": 18446744073709551615}"#), None);
        assert_eq!(parse(r#"{"access_token": "a", "expires_in": true}"#), None);
        assert_eq!(parse(r#"{"access_token": "a", "expires_in": "soon"}"#), None);
    }

    #[test]
    fn raw_token_response_joins_scope_list() {
        let raw: RawTokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "scope": ["openid", "email"]}"#).unwrap();
        assert_eq!(raw.scope.map(GrantedScope::into_string).as_deref(), Some("openid email"));
    }

    #[test]
    fn callback_without_code_deserializes() {
        let callback: AuthorizationResponse = serde_json::from_str(
            r#"{"state": "s", "error": "access_denied", "error_description": "User declined"}"#,
        )
        .unwrap();
        assert!(callback.code.is_empty());
        assert_eq!(callback.error.as_deref(), Some("access_denied"));
    }

    #[test]
    fn unknown_expiry_is_not_treated_as_valid_forever() {
        let now = Utc::now();
        let mut token = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            scope: None,
            id_token: None,
            issued_at: now,
            expires_at: None,
        };
        assert_eq!(token.is_expired_at(now), None);

        token.expires_at = Some(now + Duration::seconds(60));
        assert_eq!(token.is_expired_at(now), Some(false));
        assert_eq!(token.is_expired_at(now + Duration::seconds(61)), Some(true));
    }

    #[test]
    fn token_debug_redacts_secrets() {
        let token = TokenResponse {
            access_token: "very-secret-access".to_string(),
            refresh_token: Some("very-secret-refresh".to_string()),
            token_type: "Bearer".to_string(),
            scope: None,
            id_token: None,
            issued_at: Utc::now(),
            expires_at: None,
        };
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("very-secret-access"));
        assert!(!rendered.contains("very-secret-refresh"));
    }
}
