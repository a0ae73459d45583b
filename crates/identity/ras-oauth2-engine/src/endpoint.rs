//! Service endpoint descriptors.

use crate::error::{OAuth2Error, OAuth2Result};
use url::Url;

/// Which of the three provider services an endpoint addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Authorize,
    Token,
    UserInfo,
}

/// A service location split into origin, path and fixed query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_uri: String,
    pub resource: String,
    /// Ordered; duplicate keys are allowed.
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(base_uri: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            resource: resource.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Join base and resource into an absolute URL carrying the fixed query.
    pub fn to_url(&self) -> OAuth2Result<Url> {
        if !self.resource.starts_with('/') {
            return Err(OAuth2Error::config(format!(
                "endpoint resource `{}` must start with '/'",
                self.resource
            )));
        }

        let base = self.base_uri.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{}", self.resource))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(OAuth2Error::config(format!(
                "endpoint base `{}` is not an absolute origin",
                self.base_uri
            )));
        }

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}
