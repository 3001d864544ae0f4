// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 authorization code flow against Discord.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{Error, Result};
use crate::models::{OAuth2Scope, OAuth2Tokens, TokenResponse};
use crate::services::http::{Auth, Body, HttpClient, Route};
use crate::services::oauth_state::OAuthStateSigner;

/// Revocation is best-effort; don't let it hold up the caller.
const REVOKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds authorization URLs and talks to the token endpoints.
pub struct OAuth2Flow {
    http: Arc<HttpClient>,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    scopes: Vec<OAuth2Scope>,
    authorize_url: String,
    state: OAuthStateSigner,
}

impl OAuth2Flow {
    pub fn new(http: Arc<HttpClient>, config: &ClientConfig) -> Result<Self> {
        let state = match &config.state_secret {
            Some(secret) => OAuthStateSigner::new(secret.clone()),
            None => OAuthStateSigner::random()?,
        };

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            authorize_url: config.authorize_url.clone(),
            state,
        })
    }

    pub fn scopes(&self) -> &[OAuth2Scope] {
        &self.scopes
    }

    /// URL to send the user to. Carries a fresh signed state token.
    pub fn authorization_url(&self) -> Result<String> {
        let redirect_uri = self
            .redirect_uri
            .as_deref()
            .ok_or(ConfigError::Missing("redirect_uri"))?;
        let state = self.state.issue()?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&prompt=consent&state={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&OAuth2Scope::join(&self.scopes)),
            state
        ))
    }

    /// Check a state value returned to the redirect URI.
    pub fn verify_state(&self, state: &str) -> Result<()> {
        self.state.verify(state)
    }

    /// Exchange an authorization code for tokens.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<OAuth2Tokens> {
        let secret = self.client_secret()?;
        let redirect_uri = self
            .redirect_uri
            .as_deref()
            .ok_or(ConfigError::Missing("redirect_uri"))?;

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret),
            ("redirect_uri", redirect_uri),
        ];

        let issued_at = Utc::now();
        let response: TokenResponse = self
            .http
            .request(&Route::post("/oauth2/token"), Auth::None, Body::Form(&form))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Token exchange failed"))?;

        tracing::info!("Authorization code exchanged for tokens");
        Ok(OAuth2Tokens::from_response(response, issued_at))
    }

    /// Trade a refresh token for a new pair.
    ///
    /// A rejected refresh token surfaces as [`Error::Unauthorized`]: the user
    /// has to authorize again.
    #[instrument(skip_all)]
    pub async fn refresh(&self, tokens: &OAuth2Tokens) -> Result<OAuth2Tokens> {
        let secret = self.client_secret()?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", tokens.refresh_token()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret),
        ];

        let issued_at = Utc::now();
        let response: TokenResponse = self
            .http
            .request(&Route::post("/oauth2/token"), Auth::None, Body::Form(&form))
            .await
            .map_err(|e| match e {
                Error::InvalidGrant { message } => Error::Unauthorized { message },
                other => other,
            })?;

        tracing::info!("Access token refreshed");
        Ok(OAuth2Tokens::from_response(response, issued_at))
    }

    /// Revoke the grant behind `tokens`. Failures are logged, never returned.
    #[instrument(skip_all)]
    pub async fn revoke(&self, tokens: OAuth2Tokens) {
        let Ok(secret) = self.client_secret() else {
            tracing::warn!("Cannot revoke token without a client secret");
            return;
        };

        let form = [
            ("token", tokens.access_token()),
            ("token_type_hint", "access_token"),
        ];
        let route = Route::post("/oauth2/token/revoke").with_timeout(REVOKE_TIMEOUT);
        let auth = Auth::Basic {
            id: &self.client_id,
            secret,
        };

        match self.http.request_empty(&route, auth, Body::Form(&form)).await {
            Ok(()) => tracing::info!("Token revoked"),
            Err(e) => tracing::warn!(error = %e, "Token revocation failed"),
        }
    }

    fn client_secret(&self) -> Result<&str> {
        self.client_secret
            .as_deref()
            .ok_or(Error::Config(ConfigError::Missing("client_secret")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(config: ClientConfig) -> OAuth2Flow {
        let config = config.validate().unwrap();
        OAuth2Flow::new(Arc::new(HttpClient::new(&config)), &config).unwrap()
    }

    #[test]
    fn test_authorization_url_params() {
        let flow = flow(
            ClientConfig::new("1234")
                .with_redirect_uri("https://example.com/verified-role")
                .with_state_secret(b"secret".to_vec()),
        );
        let url = flow.authorization_url().unwrap();

        assert!(url.starts_with("https://discord.com/oauth2/authorize?"));
        assert!(url.contains("client_id=1234"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fverified-role"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=role_connections.write%20identify"));
        assert!(url.contains("prompt=consent"));

        let state = url.split("state=").nth(1).unwrap();
        assert!(flow.verify_state(state).is_ok());
    }

    #[test]
    fn test_authorization_url_requires_redirect_uri() {
        let flow = flow(ClientConfig::new("1234"));
        assert!(matches!(
            flow.authorization_url(),
            Err(Error::Config(ConfigError::Missing("redirect_uri")))
        ));
    }

    #[tokio::test]
    async fn test_exchange_requires_client_secret() {
        let flow = flow(ClientConfig::new("1234").with_redirect_uri("https://example.com"));
        assert!(matches!(
            flow.exchange_code("code").await,
            Err(Error::Config(ConfigError::Missing("client_secret")))
        ));
    }
}
