// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! [`LinkedRolesClient`], the entry point of the library.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::models::{OAuth2Tokens, RoleConnection, RoleMetadataRecord, User};
use crate::services::{
    HttpClient, MetadataRegistry, OAuth2Flow, RoleConnectionClient, RoleConnectionUpdate,
    TokenStore,
};

/// Discord linked roles client.
///
/// Create one per application and share it (it is `Send + Sync`). Call
/// [`start`](Self::start) before the first request and [`close`](Self::close)
/// on shutdown.
///
/// ```no_run
/// # async fn run() -> linked_roles::Result<()> {
/// use linked_roles::{ClientConfig, LinkedRolesClient};
///
/// let client = LinkedRolesClient::new(
///     ClientConfig::new("1234")
///         .with_client_secret("secret")
///         .with_redirect_uri("https://example.com/verified-role"),
/// )?;
/// client.start().await?;
/// let url = client.authorization_url()?;
/// # let _ = url;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct LinkedRolesClient {
    config: ClientConfig,
    http: Arc<HttpClient>,
    flow: Arc<OAuth2Flow>,
    tokens: TokenStore,
    registry: Arc<MetadataRegistry>,
    connections: RoleConnectionClient,
}

impl LinkedRolesClient {
    /// Validate `config` and wire up the services. No I/O happens here.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.validate()?;

        let http = Arc::new(HttpClient::new(&config));
        let flow = Arc::new(OAuth2Flow::new(http.clone(), &config)?);
        let tokens = TokenStore::new(flow.clone(), config.refresh_skew);
        let registry = Arc::new(MetadataRegistry::new(http.clone(), &config));
        let connections =
            RoleConnectionClient::new(http.clone(), tokens.clone(), registry.clone(), &config);

        Ok(Self {
            config,
            http,
            flow,
            tokens,
            registry,
            connections,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the HTTP session. With a bot token configured, the metadata
    /// schema is fetched as well so role connection edits can be checked
    /// locally; failing to fetch it is logged and not fatal.
    pub async fn start(&self) -> Result<()> {
        self.http.start().await?;

        if self.config.bot_token.is_some() {
            match self.registry.list().await {
                Ok(records) => tracing::info!(count = records.len(), "Role metadata loaded"),
                Err(e) => tracing::warn!(error = %e, "Could not load role metadata"),
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.http.close().await;
    }

    pub async fn is_closed(&self) -> bool {
        self.http.is_closed().await
    }

    /// Forget the cached metadata schema.
    pub fn clear(&self) {
        self.registry.clear();
    }

    // OAuth2

    pub fn authorization_url(&self) -> Result<String> {
        self.flow.authorization_url()
    }

    pub fn verify_state(&self, state: &str) -> Result<()> {
        self.flow.verify_state(state)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<OAuth2Tokens> {
        self.flow.exchange_code(code).await
    }

    pub async fn refresh(&self, tokens: &OAuth2Tokens) -> Result<OAuth2Tokens> {
        self.flow.refresh(tokens).await
    }

    /// Revoke and drop `tokens`. Best effort; never fails.
    pub async fn revoke(&self, tokens: OAuth2Tokens) {
        self.flow.revoke(tokens).await
    }

    // Tokens

    pub fn is_expired(&self, tokens: &OAuth2Tokens) -> bool {
        self.tokens.is_expired(tokens)
    }

    /// See [`TokenStore::ensure_fresh`].
    pub async fn ensure_fresh(&self, tokens: &mut OAuth2Tokens) -> Result<bool> {
        self.tokens.ensure_fresh(tokens).await
    }

    // Application metadata

    pub async fn register_role_metadata(
        &self,
        records: &[RoleMetadataRecord],
    ) -> Result<Vec<RoleMetadataRecord>> {
        self.registry.register(records).await
    }

    pub async fn list_role_metadata(&self) -> Result<Vec<RoleMetadataRecord>> {
        self.registry.list().await
    }

    pub fn get_role_metadata(&self, key: &str) -> Option<RoleMetadataRecord> {
        self.registry.get(key)
    }

    pub fn is_role_metadata_fetched(&self) -> bool {
        self.registry.is_fetched()
    }

    // Users

    pub async fn fetch_user(&self, tokens: &mut OAuth2Tokens) -> Result<User> {
        self.connections.fetch_user(tokens).await
    }

    pub async fn refresh_user(&self, user: &mut User) -> Result<()> {
        self.connections.refresh_user(user).await
    }

    pub async fn is_authenticated(&self, tokens: &OAuth2Tokens) -> Result<bool> {
        self.connections.is_authenticated(tokens).await
    }

    pub async fn fetch_role_connection(&self, user: &mut User) -> Result<Option<RoleConnection>> {
        self.connections.fetch_role_connection(user).await
    }

    pub async fn edit_role_connection(
        &self,
        user: &mut User,
        connection: &RoleConnection,
    ) -> Result<RoleConnection> {
        self.connections.edit_role_connection(user, connection).await
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<RoleConnectionUpdate> {
        self.connections.subscribe()
    }
}
