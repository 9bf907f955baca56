use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::ProviderError;

/// Exchanges credentials for a bearer token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self) -> Result<String, ProviderError>;
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Caches one provider token and refreshes it once it expires.
///
/// The cache lock is held across the login call, so concurrent callers that all
/// find an expired token wait for a single refresh instead of each logging in.
pub struct TokenSession<A> {
    authenticator: A,
    ttl: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl<A: Authenticator> TokenSession<A> {
    pub fn new(authenticator: A, ttl: Duration) -> Self {
        Self {
            authenticator,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token, logging in first if there is none or it has expired.
    /// Login failures propagate; a stale token is never handed out.
    pub async fn valid_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref() {
            if Instant::now() <= current.expires_at {
                debug!("Reusing cached provider token");
                return Ok(current.token.clone());
            }
        }

        let token = self.authenticator.login().await?;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        info!("Provider token refreshed, valid for {}s", self.ttl.as_secs());
        Ok(token)
    }

    /// Drop the cached token so the next call logs in again
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
