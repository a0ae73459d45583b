//! Caller-side storage for pending authorization attempts.
//!
//! The engine never touches this module; it exists for applications that
//! want somewhere to park an [`AuthorizationAttempt`] between the redirect
//! and the callback.

use crate::clock::{Clock, SystemClock};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::types::AuthorizationAttempt;
use async_trait::async_trait;
use chrono::TimeDelta;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for attempt storage, keyed by whatever identifies the caller's
/// session.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Store an attempt, replacing any earlier one under the same key.
    async fn put(&self, key: &str, attempt: AuthorizationAttempt) -> OAuth2Result<()>;

    /// Remove and return the attempt. Missing or expired attempts are
    /// reported as [`OAuth2Error::StateMismatch`].
    async fn take(&self, key: &str) -> OAuth2Result<AuthorizationAttempt>;

    /// Drop expired attempts, returning how many were removed.
    async fn purge_expired(&self) -> OAuth2Result<usize>;
}

/// In-memory implementation of [`AttemptStore`]
pub struct InMemoryAttemptStore {
    attempts: Arc<RwLock<HashMap<String, AuthorizationAttempt>>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl InMemoryAttemptStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self::with_clock(ttl_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            ttl: TimeDelta::try_seconds(ttl_seconds).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    fn is_expired(&self, attempt: &AuthorizationAttempt) -> bool {
        self.clock.now() - attempt.created_at > self.ttl
    }
}

impl Default for InMemoryAttemptStore {
    fn default() -> Self {
        Self::new(600) // 10 minutes
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn put(&self, key: &str, attempt: AuthorizationAttempt) -> OAuth2Result<()> {
        let mut attempts = self.attempts.write().await;
        attempts.insert(key.to_string(), attempt);
        Ok(())
    }

    async fn take(&self, key: &str) -> OAuth2Result<AuthorizationAttempt> {
        let mut attempts = self.attempts.write().await;

        let attempt = attempts.remove(key).ok_or(OAuth2Error::StateMismatch)?;

        if self.is_expired(&attempt) {
            debug!("Discarded expired authorization attempt");
            return Err(OAuth2Error::StateMismatch);
        }

        Ok(attempt)
    }

    async fn purge_expired(&self) -> OAuth2Result<usize> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, attempt| !self.is_expired(attempt));
        Ok(before - attempts.len())
    }
}
