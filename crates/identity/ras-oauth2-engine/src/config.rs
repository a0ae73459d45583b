//! OAuth2 client configuration.

use crate::error::{OAuth2Error, OAuth2Result};
use config::{Config as ConfigBuilder, Environment};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Read-only view of the client registration the engine needs.
pub trait ClientConfiguration: Send + Sync {
    fn client_id(&self) -> &str;

    /// Present for confidential clients.
    fn client_secret(&self) -> Option<&str>;

    fn redirect_uri(&self) -> &str;

    fn scopes(&self) -> &[String];
}

/// Plain client configuration, loadable from the environment.
#[derive(Clone, Deserialize)]
pub struct OAuth2ClientConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl OAuth2ClientConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            scopes: Vec::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Load `<PREFIX>__CLIENT_ID`, `<PREFIX>__CLIENT_SECRET`,
    /// `<PREFIX>__REDIRECT_URI` and space separated `<PREFIX>__SCOPES`.
    pub fn from_env(prefix: &str) -> OAuth2Result<Self> {
        let settings = ConfigBuilder::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("scopes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| OAuth2Error::config(format!("failed to read environment: {e}")))?;

        let loaded: Self = settings
            .try_deserialize()
            .map_err(|e| OAuth2Error::config(format!("invalid client configuration: {e}")))?;

        loaded.validate()?;
        debug!(
            "Loaded OAuth2 client configuration for client {} from {}__*",
            loaded.client_id, prefix
        );
        Ok(loaded)
    }

    pub fn validate(&self) -> OAuth2Result<()> {
        validate_client(self)
    }
}

impl fmt::Debug for OAuth2ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2ClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ClientConfiguration for OAuth2ClientConfig {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|s| !s.is_empty())
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Checks the settings every flow needs: a client id and an absolute
/// redirect URI.
pub(crate) fn validate_client(config: &dyn ClientConfiguration) -> OAuth2Result<()> {
    if config.client_id().trim().is_empty() {
        return Err(OAuth2Error::config("client_id is not configured"));
    }
    if config.redirect_uri().trim().is_empty() {
        return Err(OAuth2Error::config("redirect_uri is not configured"));
    }
    url::Url::parse(config.redirect_uri())
        .map_err(|e| OAuth2Error::config(format!("redirect_uri is not an absolute URL: {e}")))?;
    Ok(())
}
