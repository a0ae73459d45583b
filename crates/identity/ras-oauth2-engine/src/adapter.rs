//! The capability set every identity provider plugs into the engine.

use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::request::RequestContext;
use crate::types::UserProfile;

/// How a provider relates to PKCE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkceSupport {
    /// The provider rejects or ignores `code_challenge`.
    Unsupported,
    /// The caller decides per login.
    Optional,
    /// Every login uses PKCE regardless of what the caller asks for.
    Required,
}

impl PkceSupport {
    /// Resolve the caller's request against the provider capability.
    pub fn resolve(self, requested: bool) -> OAuth2Result<bool> {
        match (self, requested) {
            (PkceSupport::Required, _) => Ok(true),
            (PkceSupport::Optional, requested) => Ok(requested),
            (PkceSupport::Unsupported, false) => Ok(false),
            (PkceSupport::Unsupported, true) => Err(OAuth2Error::config(
                "PKCE was requested but the provider does not support it",
            )),
        }
    }
}

/// Provider-specific data and behavior. Adapters never perform I/O.
///
/// Hooks run synchronously in the order authorization, token, user info,
/// each immediately before the matching request is issued. They may add or
/// overwrite request fields but cannot touch the parameters the engine
/// computed.
pub trait ProviderAdapter: Send + Sync {
    /// Name stamped on every [`UserProfile`] this adapter produces.
    fn name(&self) -> &str;

    /// Endpoint resolution table. Pure; no I/O, no randomness.
    fn endpoint(&self, kind: EndpointKind) -> OAuth2Result<Endpoint>;

    /// Map a raw user-info body to the normalized profile.
    ///
    /// Only a missing or malformed `id` is an error; absent optional fields
    /// map to empty or `None`.
    fn parse_profile(&self, raw: &str) -> OAuth2Result<UserProfile>;

    fn pkce_support(&self) -> PkceSupport {
        PkceSupport::Optional
    }

    fn before_authorization_request(&self, _ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        Ok(())
    }

    fn before_token_request(&self, _ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        Ok(())
    }

    /// Defaults to presenting the access token as a bearer credential.
    fn before_user_info_request(&self, ctx: &mut RequestContext<'_>) -> OAuth2Result<()> {
        let token = ctx
            .token
            .ok_or_else(|| OAuth2Error::config("user info request has no access token"))?;
        ctx.request.bearer_auth(&token.access_token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_resolution() {
        assert!(PkceSupport::Required.resolve(false).unwrap());
        assert!(PkceSupport::Optional.resolve(true).unwrap());
        assert!(!PkceSupport::Optional.resolve(false).unwrap());
        assert!(!PkceSupport::Unsupported.resolve(false).unwrap());
        assert!(matches!(
            PkceSupport::Unsupported.resolve(true),
            Err(OAuth2Error::Configuration(_))
        ));
    }
}
