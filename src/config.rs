// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration.
//!
//! [`ClientConfig`] is what the library needs; [`Config`] wraps it with the
//! settings of the bundled binaries and loads both from environment variables.

use std::env;
use std::time::Duration;

use crate::models::OAuth2Scope;

/// Discord REST API base.
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";
/// Page the user is redirected to for authorization.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

/// Settings for [`crate::LinkedRolesClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Application (client) ID; also the application ID in API paths.
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Bot token, used for the application-scoped metadata endpoints.
    pub bot_token: Option<String>,
    pub scopes: Vec<OAuth2Scope>,
    /// Key for signing the OAuth state parameter. Random per client if unset.
    pub state_secret: Option<Vec<u8>>,
    pub api_base_url: String,
    pub authorize_url: String,
    pub request_timeout: Duration,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Tokens expiring within this window are treated as expired.
    pub refresh_skew: Duration,
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            bot_token: None,
            scopes: vec![OAuth2Scope::RoleConnectionsWrite, OAuth2Scope::Identify],
            state_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            refresh_skew: Duration::from_secs(60),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = OAuth2Scope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    pub fn with_state_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.state_secret = Some(secret.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    /// Normalize and check the configuration.
    ///
    /// A redirect URI starting with `localhost` gets an `http://` prefix; any
    /// other value must be an http(s) URL.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client_id"));
        }

        self.redirect_uri = self
            .redirect_uri
            .take()
            .map(normalize_redirect_uri)
            .transpose()?;

        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self.bot_token = self
            .bot_token
            .take()
            .map(|t| t.strip_prefix("Bot ").unwrap_or(&t).trim().to_string());

        if !self.scopes.contains(&OAuth2Scope::Identify) {
            tracing::warn!("You must specify the {} scope", OAuth2Scope::Identify);
        }
        if !self.scopes.contains(&OAuth2Scope::RoleConnectionsWrite) {
            tracing::warn!(
                "You must specify the {} scope",
                OAuth2Scope::RoleConnectionsWrite
            );
        }

        Ok(self)
    }
}

fn normalize_redirect_uri(uri: String) -> Result<String, ConfigError> {
    let uri = uri.trim().to_string();
    if uri.starts_with("localhost") {
        return Ok(format!("http://{uri}"));
    }

    let rest = uri
        .strip_prefix("https://")
        .or_else(|| uri.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() => Ok(uri),
        _ => Err(ConfigError::Invalid {
            var: "redirect_uri",
            reason: format!("{uri:?} must be a valid http or https url"),
        }),
    }
}

/// Configuration of the bundled binaries, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    /// Platform name shown on the user's profile.
    pub platform_name: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut client = ClientConfig::new(
            env::var("DISCORD_CLIENT_ID").map_err(|_| ConfigError::Missing("DISCORD_CLIENT_ID"))?,
        );

        client.client_secret = optional_var("DISCORD_CLIENT_SECRET");
        client.redirect_uri = optional_var("DISCORD_REDIRECT_URI");
        client.bot_token = optional_var("DISCORD_TOKEN");
        client.state_secret = optional_var("COOKIE_SECRET").map(String::into_bytes);

        if let Some(url) = optional_var("DISCORD_API_URL") {
            client.api_base_url = url;
        }

        if let Some(scopes) = optional_var("DISCORD_SCOPES") {
            client.scopes = OAuth2Scope::parse_list(&scopes);
        }

        if let Some(secs) = optional_var("REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_SECS",
                reason: format!("{secs:?} is not a number of seconds"),
            })?;
            client.request_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            client: client.validate()?,
            platform_name: env::var("PLATFORM_NAME")
                .unwrap_or_else(|_| "Linked Roles".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
