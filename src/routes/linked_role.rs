// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked role verification flow and role connection updates.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{MetadataValue, RoleConnection, User};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/linked-role", get(linked_role))
        .route("/verified-role", get(verified_role))
        .route("/users/{id}/role-connection", post(update_role_connection))
        .route("/users/{id}/unlink", post(unlink))
}

/// Linked Roles Verification URL: send the user to Discord.
async fn linked_role(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let url = state.client.authorization_url()?;
    tracing::info!("Starting OAuth flow, redirecting to Discord");
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Role connection as shown to the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleConnectionResponse {
    pub user_id: String,
    pub username: String,
    pub platform_name: String,
    pub platform_username: String,
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl RoleConnectionResponse {
    fn new(user: &User, connection: &RoleConnection) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            platform_name: connection.platform_name().to_string(),
            platform_username: connection.platform_username().to_string(),
            metadata: connection.metadata().clone(),
        }
    }
}

/// OAuth redirect target: exchange the code, then link the account.
async fn verified_role(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<RoleConnectionResponse>> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Discord");
        return Err(Error::Unauthorized {
            message: format!("Authorization was not granted: {error}"),
        });
    }

    state
        .client
        .verify_state(params.state.as_deref().ok_or(Error::InvalidState)?)?;
    let code = params
        .code
        .ok_or_else(|| Error::validation("Missing authorization code"))?;

    let mut tokens = state.client.exchange_code(&code).await?;
    let mut user = state.client.fetch_user(&mut tokens).await?;

    let mut connection = RoleConnection::new(&state.config.platform_name, &user.username)?;
    connection
        .add_metadata("verified", true)?
        .add_metadata("last_update", Utc::now())?;
    let connection = state
        .client
        .edit_role_connection(&mut user, &connection)
        .await?;

    tracing::info!(user_id = %user.id, "Account linked");

    let response = RoleConnectionResponse::new(&user, &connection);
    state
        .users
        .insert(user.id.clone(), Arc::new(Mutex::new(user)));
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    platform_username: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, MetadataValue>,
}

/// Merge new values into the user's current role connection.
async fn update_role_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<RoleConnectionResponse>> {
    let user = state.user(&id).ok_or_else(|| Error::NotFound {
        message: format!("User {id} is not linked"),
    })?;
    // Held across the read and the write so concurrent updates can't
    // interleave or refresh the same tokens twice.
    let mut user = user.lock().await;

    let mut connection = match state.client.fetch_role_connection(&mut user).await? {
        Some(connection) => connection,
        None => RoleConnection::new(&state.config.platform_name, &user.username)?,
    };

    if let Some(username) = request.platform_username {
        connection.set_platform_username(username)?;
    }
    for (key, value) in request.metadata {
        connection.add_or_edit_metadata(key, value)?;
    }

    let connection = state
        .client
        .edit_role_connection(&mut user, &connection)
        .await?;
    Ok(Json(RoleConnectionResponse::new(&user, &connection)))
}

/// Revoke the user's grant and forget them.
async fn unlink(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode> {
    let (_, user) = state.users.remove(&id).ok_or_else(|| Error::NotFound {
        message: format!("User {id} is not linked"),
    })?;

    let tokens = user.lock().await.tokens().clone();
    state.client.revoke(tokens).await;

    tracing::info!(user_id = %id, "Account unlinked");
    Ok(StatusCode::NO_CONTENT)
}
