//! Shipped provider adapters.

mod azure;
mod google;

pub use azure::AzureAdapter;
pub use google::GoogleAdapter;

use crate::adapter::{PkceSupport, ProviderAdapter};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::request::RequestContext;
use crate::types::UserProfile;
use serde_json::Value;

/// Closed set of the adapters this crate ships.
#[derive(Debug, Clone)]
pub enum KnownProvider {
    Azure(AzureAdapter),
    Google(GoogleAdapter),
}

impl KnownProvider {
    /// Default-configured adapter by case-insensitive name.
    pub fn from_name(name: &str) -> OAuth2Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "azure" => Ok(KnownProvider::Azure(AzureAdapter::default())),
            "google" => Ok(KnownProvider::Google(GoogleAdapter::default())),
            other => Err(OAuth2Error::config(format!("unknown provider `{other}`"))),
        }
    }

    fn inner(&self) -> &dyn ProviderAdapter {
        match self {
            KnownProvider::Azure(adapter) => adapter,
            KnownProvider::Google(adapter) => adapter,
        }
    }
}

impl ProviderAdapter for KnownProvider {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn endpoint(&self, kind: EndpointKind) -> OAuth2Result<Endpoint> {
        self.inner().endpoint(kind)
    }

    fn parse_profile(&self, raw: &str) -> OAuth2Result<UserProfile> {
        self.inner().parse_profile(raw)
    }

    fn pkce_support(&self) -> PkceSupport {
        self.inner().pkce_support()
    }

    fn before_authorization_request(&self, ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        self.inner().before_authorization_request(ctx)
    }

    fn before_token_request(&self, ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        self.inner().before_token_request(ctx)
    }

    fn before_user_info_request(&self, ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        self.inner().before_user_info_request(ctx)
    }
}

/// Field names a provider uses for the normalized profile. `id` is the only
/// required one.
pub(crate) struct ProfileFields {
    pub id: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
}

/// Profile fields pulled out of a user-info body.
pub(crate) struct ParsedProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub body: Value,
}

impl ProfileFields {
    pub fn extract(&self, raw: &str) -> OAuth2Result<ParsedProfile> {
        let body: Value = serde_json::from_str(raw).map_err(|_| OAuth2Error::parse(self.id))?;
        if !body.is_object() {
            return Err(OAuth2Error::parse(self.id));
        }

        let id = match body.get(self.id) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(OAuth2Error::parse(self.id)),
        };

        Ok(ParsedProfile {
            id,
            first_name: optional_str(&body, self.first_name).unwrap_or_default(),
            last_name: optional_str(&body, self.last_name).unwrap_or_default(),
            email: optional_str(&body, self.email),
            body,
        })
    }
}

/// A non-empty string field; anything else reads as absent.
pub(crate) fn optional_str(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
