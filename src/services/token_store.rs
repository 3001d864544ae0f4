// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token freshness checks and the single refresh choke point.
//!
//! The store does not lock. Two tasks refreshing the same user's tokens at
//! once will both spend the refresh token and one of them will lose;
//! callers that share a user across tasks must serialize access to it (a
//! per-user mutex is enough).

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::OAuth2Tokens;
use crate::services::oauth::OAuth2Flow;

/// Margin before token expiration when we proactively refresh.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct TokenStore {
    flow: Arc<OAuth2Flow>,
    skew: Duration,
}

impl TokenStore {
    pub fn new(flow: Arc<OAuth2Flow>, skew: Duration) -> Self {
        Self { flow, skew }
    }

    /// True when the access token expires within the configured skew.
    pub fn is_expired(&self, tokens: &OAuth2Tokens) -> bool {
        tokens.is_expired(self.skew)
    }

    /// Refresh `tokens` in place if they are expired.
    ///
    /// Returns whether a refresh happened. On error `tokens` is left as it
    /// was, so the caller never ends up without a pair.
    pub async fn ensure_fresh(&self, tokens: &mut OAuth2Tokens) -> Result<bool> {
        if !self.is_expired(tokens) {
            return Ok(false);
        }

        tracing::info!(expires_at = %tokens.expires_at(), "Access token expired, refreshing");
        let fresh = self.flow.refresh(tokens).await?;
        *tokens = fresh;
        Ok(true)
    }
}
