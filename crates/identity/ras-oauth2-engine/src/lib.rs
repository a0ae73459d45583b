//! Provider-agnostic OAuth2 / OpenID Connect authorization code engine.
//!
//! One [`OAuth2Engine`] drives the whole flow (login URL with CSRF state and
//! optional PKCE, code exchange, token refresh, user-info retrieval) for any
//! identity provider. Provider differences live behind [`ProviderAdapter`]:
//! endpoint tables, profile parsing and request hooks.
//!
//! The engine keeps no per-login state. [`OAuth2Engine::build_login_url`]
//! returns an [`AuthorizationAttempt`] which the caller stores and later hands
//! back, by value, to [`OAuth2Engine::exchange_code`].

mod adapter;
mod clock;
mod config;
mod endpoint;
mod engine;
mod error;
mod flow;
mod pkce;
pub mod providers;
mod random;
mod request;
mod store;
mod transport;
mod types;

#[cfg(test)]
mod tests;

pub use adapter::{PkceSupport, ProviderAdapter};
pub use clock::{Clock, FixedClock, SystemClock};
pub use self::config::{ClientConfiguration, OAuth2ClientConfig};
pub use endpoint::{Endpoint, EndpointKind};
pub use engine::OAuth2Engine;
pub use error::{ErrorKind, OAuth2Error, OAuth2Result};
pub use flow::{FlowStage, FlowState};
pub use pkce::{PkceChallenge, code_challenge};
pub use random::{generate_url_safe_token, secure_eq};
pub use request::{OutboundRequest, RequestContext};
pub use store::{AttemptStore, InMemoryAttemptStore};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::{AuthorizationAttempt, AuthorizationResponse, AvatarUris, TokenResponse, UserProfile};

// Re-exported so callers can pass cancellation signals without a direct dependency.
pub use tokio_util::sync::CancellationToken;
