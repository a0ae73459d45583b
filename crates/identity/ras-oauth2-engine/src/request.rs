//! Outbound requests as seen by provider hooks.

use crate::endpoint::Endpoint;
use crate::error::{OAuth2Error, OAuth2Result};
use crate::transport::{HttpMethod, HttpRequest};
use crate::types::{AuthorizationAttempt, TokenResponse};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::collections::HashSet;

/// A request under construction.
///
/// Parameters the engine sets are locked: hooks may add new fields or
/// overwrite unlocked ones, but nothing can be removed and locked fields
/// cannot be touched.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: HttpMethod,
    endpoint: Endpoint,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    locked_query: HashSet<String>,
    locked_form: HashSet<String>,
}

impl OutboundRequest {
    pub(crate) fn new(method: HttpMethod, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            headers: Vec::new(),
            query: Vec::new(),
            form: Vec::new(),
            locked_query: HashSet::new(),
            locked_form: HashSet::new(),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        lookup(&self.query, key)
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        lookup(&self.form, key)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or overwrite a query parameter.
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> OAuth2Result<()> {
        let key = key.into();
        if self.locked_query.contains(&key) {
            return Err(locked_error("query", &key));
        }
        upsert(&mut self.query, key, value.into());
        Ok(())
    }

    pub fn is_query_locked(&self, key: &str) -> bool {
        self.locked_query.contains(key)
    }

    /// Add or overwrite a form body parameter.
    pub fn set_form(&mut self, key: impl Into<String>, value: impl Into<String>) -> OAuth2Result<()> {
        let key = key.into();
        if self.locked_form.contains(&key) {
            return Err(locked_error("form", &key));
        }
        upsert(&mut self.form, key, value.into());
        Ok(())
    }

    /// Add or overwrite a header. Header names compare case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.1 = value.into(),
            None => self.headers.push((name, value.into())),
        }
    }

    pub fn bearer_auth(&mut self, token: &str) {
        self.set_header("Authorization", format!("Bearer {token}"));
    }

    /// `client_secret_basic` authentication (RFC 6749 §2.3.1).
    pub fn basic_auth(&mut self, username: &str, password: &str) {
        let encoded = STANDARD.encode(format!(
            "{}:{}",
            form_encode(username),
            form_encode(password)
        ));
        self.set_header("Authorization", format!("Basic {encoded}"));
    }

    pub(crate) fn lock_query(&mut self, key: &str, value: impl Into<String>) {
        upsert(&mut self.query, key.to_string(), value.into());
        self.locked_query.insert(key.to_string());
    }

    pub(crate) fn lock_form(&mut self, key: &str, value: impl Into<String>) {
        upsert(&mut self.form, key.to_string(), value.into());
        self.locked_form.insert(key.to_string());
    }

    /// Lock a form key without sending it.
    pub(crate) fn forbid_form(&mut self, key: &str) {
        self.locked_form.insert(key.to_string());
    }

    /// Final URL: endpoint query first, then request query.
    pub fn url(&self) -> OAuth2Result<url::Url> {
        let mut url = self.endpoint.to_url()?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub(crate) fn into_http(mut self) -> OAuth2Result<HttpRequest> {
        let url = self.url()?.to_string();
        if self.header_value("Accept").is_none() {
            self.set_header("Accept", "application/json");
        }

        let body = if self.form.is_empty() {
            None
        } else {
            self.set_header("Content-Type", "application/x-www-form-urlencoded");
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &self.form {
                serializer.append_pair(key, value);
            }
            Some(serializer.finish())
        };

        Ok(HttpRequest {
            method: self.method,
            url,
            headers: self.headers,
            body,
        })
    }
}

/// What a hook gets to work with: the pending request plus the flow value
/// it belongs to.
pub struct RequestContext<'a> {
    pub request: &'a mut OutboundRequest,
    pub attempt: Option<&'a AuthorizationAttempt>,
    pub token: Option<&'a TokenResponse>,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn for_attempt(request: &'a mut OutboundRequest, attempt: &'a AuthorizationAttempt) -> Self {
        Self {
            request,
            attempt: Some(attempt),
            token: None,
        }
    }

    pub(crate) fn for_token(request: &'a mut OutboundRequest, token: &'a TokenResponse) -> Self {
        Self {
            request,
            attempt: None,
            token: Some(token),
        }
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn upsert(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(existing) => existing.1 = value,
        None => pairs.push((key, value)),
    }
}

fn form_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn locked_error(location: &str, key: &str) -> OAuth2Error {
    OAuth2Error::config(format!(
        "hook attempted to overwrite engine-mandated {location} parameter `{key}`"
    ))
}
