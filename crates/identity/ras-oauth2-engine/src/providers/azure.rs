//! Microsoft identity platform (Azure AD / Entra ID) v2.0 endpoints with
//! Microsoft Graph as the user-info source.

use super::ProfileFields;
use crate::adapter::{PkceSupport, ProviderAdapter};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::request::RequestContext;
use crate::types::{AvatarUris, UserProfile};

const LOGIN_BASE: &str = "https://login.microsoftonline.com";
const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";
/// Profile photos are served from the beta Graph surface.
const PHOTO_BASE: &str = "https://graph.microsoft.com/beta";

const FIELDS: ProfileFields = ProfileFields {
    id: "id",
    first_name: "givenName",
    last_name: "surname",
    email: "mail",
};

#[derive(Debug, Clone)]
pub struct AzureAdapter {
    tenant: String,
    login_base: String,
    graph_base: String,
    photo_base: String,
}

impl Default for AzureAdapter {
    fn default() -> Self {
        Self::new("common")
    }
}

impl AzureAdapter {
    /// `tenant` is a directory id, a verified domain, or one of `common`,
    /// `organizations`, `consumers`.
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            login_base: LOGIN_BASE.to_string(),
            graph_base: GRAPH_BASE.to_string(),
            photo_base: PHOTO_BASE.to_string(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Override the login authority, e.g. for national clouds.
    pub fn with_login_base(mut self, base: impl Into<String>) -> Self {
        self.login_base = base.into();
        self
    }

    pub fn with_graph_base(mut self, base: impl Into<String>) -> Self {
        self.graph_base = base.into();
        self
    }

    pub fn with_photo_base(mut self, base: impl Into<String>) -> Self {
        self.photo_base = base.into();
        self
    }

    fn tenant_path(&self) -> OAuth2Result<&str> {
        let valid = !self.tenant.is_empty()
            && self
                .tenant
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        if valid {
            Ok(&self.tenant)
        } else {
            Err(OAuth2Error::config(format!(
                "invalid Azure tenant `{}`",
                self.tenant
            )))
        }
    }

    /// The user id goes in as one escaped path segment.
    fn avatar(&self, user_id: &str, size: &str) -> OAuth2Result<String> {
        let mut url = url::Url::parse(&self.photo_base)?;
        url.path_segments_mut()
            .map_err(|_| OAuth2Error::config(format!("invalid photo base `{}`", self.photo_base)))?
            .pop_if_empty()
            .extend(["users", user_id, "photos", size]);
        Ok(url.into())
    }
}

impl ProviderAdapter for AzureAdapter {
    fn name(&self) -> &str {
        "Azure"
    }

    fn endpoint(&self, kind: EndpointKind) -> OAuth2Result<Endpoint> {
        Ok(match kind {
            EndpointKind::Authorize => Endpoint::new(
                self.login_base.as_str(),
                format!("/{}/oauth2/v2.0/authorize", self.tenant_path()?),
            ),
            EndpointKind::Token => Endpoint::new(
                self.login_base.as_str(),
                format!("/{}/oauth2/v2.0/token", self.tenant_path()?),
            ),
            EndpointKind::UserInfo => Endpoint::new(self.graph_base.as_str(), "/me"),
        })
    }

    fn parse_profile(&self, raw: &str) -> OAuth2Result<UserProfile> {
        let parsed = FIELDS.extract(raw)?;

        Ok(UserProfile {
            avatar_uris: AvatarUris {
                small: Some(self.avatar(&parsed.id, "48x48")?),
                normal: Some(self.avatar(&parsed.id, "96x96")?),
                large: Some(self.avatar(&parsed.id, "240x240")?),
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
        let attempt = ctx
            .attempt
            .ok_or_else(|| OAuth2Error::config("Azure authorization request has no attempt"))?;

        ctx.request.set_query("response_mode", "query")?;
        ctx.request.set_query("nonce", attempt.nonce.as_str())?;
        Ok(())
    }
}
