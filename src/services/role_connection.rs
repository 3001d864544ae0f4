// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-scoped calls: profile and role connection.
//!
//! Every call first runs the user's tokens through [`TokenStore::ensure_fresh`],
//! so an expired access token costs one refresh and is otherwise invisible.
//! A 401 after that is returned as is; retrying it would loop on a revoked
//! grant.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::instrument;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{
    OAuth2Scope, OAuth2Tokens, RoleConnection, RoleConnectionPayload, User, UserPayload,
};
use crate::services::http::{Auth, Body, HttpClient, Route};
use crate::services::metadata::MetadataRegistry;
use crate::services::token_store::TokenStore;

/// Published after every successful role connection edit.
#[derive(Debug, Clone)]
pub struct RoleConnectionUpdate {
    pub user_id: String,
    /// What was known before the edit; `None` if nothing had been read or written.
    pub before: Option<RoleConnection>,
    pub after: RoleConnection,
}

const UPDATE_CHANNEL_CAPACITY: usize = 64;

pub struct RoleConnectionClient {
    http: Arc<HttpClient>,
    tokens: TokenStore,
    registry: Arc<MetadataRegistry>,
    application_id: String,
    scopes: Vec<OAuth2Scope>,
    updates: broadcast::Sender<RoleConnectionUpdate>,
}

impl RoleConnectionClient {
    pub fn new(
        http: Arc<HttpClient>,
        tokens: TokenStore,
        registry: Arc<MetadataRegistry>,
        config: &ClientConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            http,
            tokens,
            registry,
            application_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
            updates,
        }
    }

    /// Receive a [`RoleConnectionUpdate`] for every later edit.
    pub fn subscribe(&self) -> broadcast::Receiver<RoleConnectionUpdate> {
        self.updates.subscribe()
    }

    fn require_scope(&self, scope: OAuth2Scope) -> Result<()> {
        if self.scopes.contains(&scope) {
            Ok(())
        } else {
            Err(Error::ScopeMissing(scope))
        }
    }

    fn connection_path(&self) -> String {
        format!(
            "/users/@me/applications/{}/role-connection",
            urlencoding::encode(&self.application_id)
        )
    }

    /// Fetch the profile behind `tokens`.
    ///
    /// `tokens` is refreshed in place if needed; the returned user owns a copy
    /// and should be used for later calls.
    #[instrument(skip_all)]
    pub async fn fetch_user(&self, tokens: &mut OAuth2Tokens) -> Result<User> {
        self.require_scope(OAuth2Scope::Identify)?;
        self.tokens.ensure_fresh(tokens).await?;

        let payload = self.get_profile(tokens.access_token()).await?;
        tracing::debug!(user_id = %payload.id, "Fetched user");
        Ok(User::new(payload, tokens.clone()))
    }

    /// Re-read the profile of a known user.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn refresh_user(&self, user: &mut User) -> Result<()> {
        self.require_scope(OAuth2Scope::Identify)?;
        self.tokens.ensure_fresh(user.tokens_mut()).await?;

        let payload = self.get_profile(user.tokens().access_token()).await?;
        user.update_profile(payload);
        Ok(())
    }

    /// Whether Discord still accepts `tokens`. Does not refresh.
    pub async fn is_authenticated(&self, tokens: &OAuth2Tokens) -> Result<bool> {
        match self.get_profile(tokens.access_token()).await {
            Ok(_) => Ok(true),
            Err(Error::Unauthorized { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_profile(&self, access_token: &str) -> Result<UserPayload> {
        self.http
            .request(
                &Route::get("/users/@me"),
                Auth::Bearer(access_token),
                Body::Empty,
            )
            .await
    }

    /// Read the user's role connection for this application.
    ///
    /// `None` when the user never had one set.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn fetch_role_connection(&self, user: &mut User) -> Result<Option<RoleConnection>> {
        self.require_scope(OAuth2Scope::RoleConnectionsWrite)?;
        self.tokens.ensure_fresh(user.tokens_mut()).await?;

        let result: Result<Option<RoleConnectionPayload>> = self
            .http
            .request(
                &Route::get(self.connection_path()),
                Auth::Bearer(user.tokens().access_token()),
                Body::Empty,
            )
            .await;

        let payload = match result {
            Ok(Some(payload)) if !payload.is_empty() => payload,
            Ok(_) | Err(Error::NotFound { .. }) => {
                user.set_role_connection(None);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let connection = self.decode(payload)?;
        user.set_role_connection(Some(connection.clone()));
        Ok(Some(connection))
    }

    /// Replace the user's role connection with `connection`.
    ///
    /// This is a whole-document write: values missing from `connection` are
    /// removed on Discord's side. Merge with [`Self::fetch_role_connection`]
    /// first to update a subset.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn edit_role_connection(
        &self,
        user: &mut User,
        connection: &RoleConnection,
    ) -> Result<RoleConnection> {
        self.require_scope(OAuth2Scope::RoleConnectionsWrite)?;
        self.registry.check_connection(connection)?;
        self.tokens.ensure_fresh(user.tokens_mut()).await?;

        let body = serde_json::to_value(connection.to_payload())?;
        let payload: RoleConnectionPayload = self
            .http
            .request(
                &Route::put(self.connection_path()),
                Auth::Bearer(user.tokens().access_token()),
                Body::Json(&body),
            )
            .await?;

        let after = self.decode(payload)?;
        let before = user.set_role_connection(Some(after.clone()));
        tracing::info!(
            user_id = %user.id,
            values = after.metadata().len(),
            "Role connection updated"
        );

        // No subscribers is fine.
        let _ = self.updates.send(RoleConnectionUpdate {
            user_id: user.id.clone(),
            before,
            after: after.clone(),
        });

        Ok(after)
    }

    fn decode(&self, payload: RoleConnectionPayload) -> Result<RoleConnection> {
        RoleConnection::from_payload(payload, |key| self.registry.kind_of(key))
    }
}
