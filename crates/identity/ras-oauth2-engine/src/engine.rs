//! Authorization code engine: login URL, code exchange, refresh and
//! profile retrieval.

use crate::adapter::ProviderAdapter;
use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfiguration, validate_client};
use crate::endpoint::EndpointKind;
use crate::error::{OAuth2Error, OAuth2Result};
use crate::pkce::PkceChallenge;
use crate::random::{DEFAULT_TOKEN_BYTES, generate_url_safe_token, secure_eq};
use crate::request::{OutboundRequest, RequestContext};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::types::{
    AuthorizationAttempt, AuthorizationResponse, GrantedScope, ProviderErrorBody,
    RawTokenResponse, TokenResponse, UserProfile,
};
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest provider error body echoed into an error description.
const MAX_ERROR_BODY: usize = 512;

/// Stateless OAuth2 authorization code engine.
///
/// Holds only the transport and clock. Everything that belongs to one login
/// lives in the [`AuthorizationAttempt`] handed back to the caller, so a
/// single engine can serve any number of concurrent flows.
#[derive(Clone)]
pub struct OAuth2Engine {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl OAuth2Engine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock))
    }

    pub fn with_clock(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    /// Engine over the default `reqwest` transport.
    pub fn with_http_timeout(timeout: Duration) -> OAuth2Result<Self> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(timeout)?)))
    }

    /// Build the URL the user is redirected to, together with the attempt the
    /// caller must keep to validate the callback.
    ///
    /// `extra_query` is merged last; keys the engine set are skipped.
    pub fn build_login_url(
        &self,
        config: &dyn ClientConfiguration,
        adapter: &dyn ProviderAdapter,
        use_pkce: bool,
        extra_query: &[(String, String)],
    ) -> OAuth2Result<(String, AuthorizationAttempt)> {
        validate_client(config)?;

        let pkce = if adapter.pkce_support().resolve(use_pkce)? {
            Some(PkceChallenge::new()?)
        } else {
            None
        };

        let attempt = AuthorizationAttempt {
            state: generate_url_safe_token(DEFAULT_TOKEN_BYTES)?,
            nonce: generate_url_safe_token(DEFAULT_TOKEN_BYTES)?,
            code_challenge: pkce.as_ref().map(|p| p.code_challenge.clone()),
            code_verifier: pkce.map(|p| p.code_verifier),
            redirect_uri: config.redirect_uri().to_string(),
            scope: config.scopes().join(" "),
            created_at: self.clock.now(),
        };

        let endpoint = adapter.endpoint(EndpointKind::Authorize)?;
        let mut request = OutboundRequest::new(HttpMethod::Get, endpoint);
        request.lock_query("response_type", "code");
        request.lock_query("client_id", config.client_id());
        request.lock_query("redirect_uri", attempt.redirect_uri.as_str());
        if !attempt.scope.is_empty() {
            request.lock_query("scope", attempt.scope.as_str());
        }
        request.lock_query("state", attempt.state.as_str());
        if let Some(challenge) = &attempt.code_challenge {
            request.lock_query("code_challenge", challenge.as_str());
            request.lock_query("code_challenge_method", "S256");
        }

        adapter.before_authorization_request(&mut RequestContext::for_attempt(
            &mut request,
            &attempt,
        ))?;

        for (key, value) in extra_query {
            if request.is_query_locked(key) {
                warn!("Ignoring caller query parameter `{}`: set by the engine", key);
                continue;
            }
            request.set_query(key.as_str(), value.as_str())?;
        }

        let url = request.url()?.to_string();
        debug!(
            "Generated authorization URL for provider {} (pkce: {})",
            adapter.name(),
            attempt.code_verifier.is_some()
        );

        Ok((url, attempt))
    }

    /// Validate the callback and, if the provider reported no error, exchange
    /// its code.
    pub async fn handle_callback(
        &self,
        attempt: AuthorizationAttempt,
        callback: &AuthorizationResponse,
        config: &dyn ClientConfiguration,
        adapter: &dyn ProviderAdapter,
        cancel: &CancellationToken,
    ) -> OAuth2Result<TokenResponse> {
        if !secure_eq(&attempt.state, &callback.state) {
            warn!("Rejected callback for provider {}: state mismatch", adapter.name());
            return Err(OAuth2Error::StateMismatch);
        }

        if let Some(code) = &callback.error {
            warn!("Provider {} returned callback error {}", adapter.name(), code);
            return Err(OAuth2Error::Provider {
                code: code.clone(),
                description: callback.error_description.clone(),
            });
        }

        self.exchange_code(attempt, &callback.state, &callback.code, config, adapter, cancel)
            .await
    }

    /// Exchange an authorization code for tokens. One network round trip, no
    /// retry. The attempt is consumed whatever the outcome.
    pub async fn exchange_code(
        &self,
        attempt: AuthorizationAttempt,
        received_state: &str,
        code: &str,
        config: &dyn ClientConfiguration,
        adapter: &dyn ProviderAdapter,
        cancel: &CancellationToken,
    ) -> OAuth2Result<TokenResponse> {
        if !secure_eq(&attempt.state, received_state) {
            warn!("Rejected code exchange for provider {}: state mismatch", adapter.name());
            return Err(OAuth2Error::StateMismatch);
        }
        validate_client(config)?;
        if code.is_empty() {
            return Err(OAuth2Error::parse("code"));
        }

        let endpoint = adapter.endpoint(EndpointKind::Token)?;
        let mut request = OutboundRequest::new(HttpMethod::Post, endpoint);
        request.lock_form("grant_type", "authorization_code");
        request.lock_form("code", code);
        request.lock_form("redirect_uri", attempt.redirect_uri.as_str());
        request.lock_form("client_id", config.client_id());

        // Exactly one credential goes out; the other key is locked empty.
        match (&attempt.code_verifier, config.client_secret()) {
            (Some(verifier), _) => {
                request.lock_form("code_verifier", verifier.as_str());
                request.forbid_form("client_secret");
            }
            (None, Some(secret)) => {
                request.lock_form("client_secret", secret);
                request.forbid_form("code_verifier");
            }
            (None, None) => {
                return Err(OAuth2Error::config(
                    "token request needs either a client secret or a PKCE verifier",
                ));
            }
        }

        adapter.before_token_request(&mut RequestContext::for_attempt(&mut request, &attempt))?;

        let response = self.send(request.into_http()?, cancel).await?;
        let token = self.token_from_response(adapter, response, None)?;

        info!(
            "Successfully exchanged code for tokens with provider {}",
            adapter.name()
        );
        Ok(token)
    }

    /// Trade the refresh token for a new token set. When the provider does not
    /// rotate the refresh token the previous one is carried over.
    pub async fn refresh_token(
        &self,
        token: &TokenResponse,
        config: &dyn ClientConfiguration,
        adapter: &dyn ProviderAdapter,
        cancel: &CancellationToken,
    ) -> OAuth2Result<TokenResponse> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuth2Error::config("token has no refresh token"))?;
        validate_client(config)?;

        let endpoint = adapter.endpoint(EndpointKind::Token)?;
        let mut request = OutboundRequest::new(HttpMethod::Post, endpoint);
        request.lock_form("grant_type", "refresh_token");
        request.lock_form("refresh_token", refresh_token);
        request.lock_form("client_id", config.client_id());
        if let Some(secret) = config.client_secret() {
            request.lock_form("client_secret", secret);
        }
        if !config.scopes().is_empty() {
            request.set_form("scope", config.scopes().join(" "))?;
        }

        adapter.before_token_request(&mut RequestContext::for_token(&mut request, token))?;

        let response = self.send(request.into_http()?, cancel).await?;
        let refreshed = self.token_from_response(adapter, response, Some(refresh_token))?;

        info!("Refreshed access token with provider {}", adapter.name());
        Ok(refreshed)
    }

    /// Fetch the user-info resource and hand it to the adapter's parser.
    ///
    /// A transport failure is retried once; provider errors never are.
    pub async fn fetch_user_profile(
        &self,
        token: &TokenResponse,
        adapter: &dyn ProviderAdapter,
        cancel: &CancellationToken,
    ) -> OAuth2Result<UserProfile> {
        if token.access_token.is_empty() {
            return Err(OAuth2Error::config("access token is empty"));
        }

        let endpoint = adapter.endpoint(EndpointKind::UserInfo)?;
        let mut request = OutboundRequest::new(HttpMethod::Get, endpoint);
        adapter.before_user_info_request(&mut RequestContext::for_token(&mut request, token))?;
        let http = request.into_http()?;

        let response = match self.send(http.clone(), cancel).await {
            Err(OAuth2Error::Network(reason)) => {
                warn!(
                    "User info request to provider {} failed ({}), retrying once",
                    adapter.name(),
                    reason
                );
                self.send(http, cancel).await?
            }
            other => other?,
        };

        if !response.is_success() {
            let err = provider_error(&response);
            error!("User info request to provider {} failed: {}", adapter.name(), err);
            return Err(err);
        }

        let profile = adapter.parse_profile(&response.body)?;
        debug!(
            "Successfully retrieved user profile {} from provider {}",
            profile.id,
            adapter.name()
        );
        Ok(profile)
    }

    /// Race the transport against the caller's cancellation signal. Losing
    /// the race drops the in-flight request.
    async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> OAuth2Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(OAuth2Error::Cancelled);
        }

        let url = request.url.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request to {} cancelled", url);
                Err(OAuth2Error::Cancelled)
            }
            result = self.transport.send(request) => result,
        }
    }

    fn token_from_response(
        &self,
        adapter: &dyn ProviderAdapter,
        response: HttpResponse,
        previous_refresh_token: Option<&str>,
    ) -> OAuth2Result<TokenResponse> {
        if !response.is_success() {
            let err = provider_error(&response);
            error!("Token request to provider {} failed: {}", adapter.name(), err);
            return Err(err);
        }

        // Some providers answer 200 with an error body.
        if let Ok(body) = serde_json::from_str::<ProviderErrorBody>(&response.body) {
            error!("Token request to provider {} failed: {}", adapter.name(), body.error);
            return Err(OAuth2Error::Provider {
                code: body.error,
                description: body.error_description,
            });
        }

        let raw: RawTokenResponse = serde_json::from_str(&response.body)
            .map_err(|_| OAuth2Error::parse("access_token"))?;

        let access_token = raw
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuth2Error::parse("access_token"))?;

        let issued_at = self.clock.now();
        let expires_at = raw
            .expires_in
            .and_then(|e| e.seconds())
            .filter(|s| *s >= 0)
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));

        Ok(TokenResponse {
            access_token,
            refresh_token: raw
                .refresh_token
                .or_else(|| previous_refresh_token.map(str::to_string)),
            token_type: raw.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: raw.scope.map(GrantedScope::into_string),
            id_token: raw.id_token,
            issued_at,
            expires_at,
        })
    }
}

/// Map a non-success response to [`OAuth2Error::Provider`]. Bodies that are
/// not RFC 6749 error objects are reported as `http_<status>`.
fn provider_error(response: &HttpResponse) -> OAuth2Error {
    match serde_json::from_str::<ProviderErrorBody>(&response.body) {
        Ok(body) => OAuth2Error::Provider {
            code: body.error,
            description: body.error_description,
        },
        Err(_) => {
            let body = response.body.trim();
            OAuth2Error::Provider {
                code: format!("http_{}", response.status),
                description: (!body.is_empty())
                    .then(|| body.chars().take(MAX_ERROR_BODY).collect()),
            }
        }
    }
}
