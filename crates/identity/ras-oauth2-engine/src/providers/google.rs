//! Google OAuth2 / OpenID Connect.

use super::{ProfileFields, optional_str};
use crate::adapter::{PkceSupport, ProviderAdapter};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::OAuth2Result;
use crate::request::RequestContext;
use crate::types::{AvatarUris, UserProfile};

const FIELDS: ProfileFields = ProfileFields {
    id: "sub",
    first_name: "given_name",
    last_name: "family_name",
    email: "email",
};

#[derive(Debug, Clone, Default)]
pub struct GoogleAdapter {
    offline_access: bool,
}

impl GoogleAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a refresh token (`access_type=offline`, `prompt=consent`).
    pub fn with_offline_access(mut self) -> Self {
        self.offline_access = true;
        self
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "Google"
    }

    fn endpoint(&self, kind: EndpointKind) -> OAuth2Result<Endpoint> {
        Ok(match kind {
            EndpointKind::Authorize => Endpoint::new("https://accounts.google.com", "/o/oauth2/v2/auth"),
            EndpointKind::Token => Endpoint::new("https://oauth2.googleapis.com", "/token"),
            EndpointKind::UserInfo => {
                Endpoint::new("https://openidconnect.googleapis.com", "/v1/userinfo")
            }
        })
    }

    fn parse_profile(&self, raw: &str) -> OAuth2Result<UserProfile> {
        let parsed = FIELDS.extract(raw)?;

        Ok(UserProfile {
            avatar_uris: AvatarUris {
                normal: optional_str(&parsed.body, "picture"),
                ..AvatarUris::default()
            },
            id: parsed.id,
            first_name: parsed.first_name,
            last_name: parsed.last_name,
            email: parsed.email,
            provider_name: self.name().to_string(),
        })
    }

    fn pkce_support(&self) -> PkceSupport {
        PkceSupport::Optional
    }

    fn before_authorization_request(&self, ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        if self.offline_access {
            ctx.request.set_query("access_type", "offline")?;
            ctx.request.set_query("prompt", "consent")?;
        }
        Ok(())
    }
}
