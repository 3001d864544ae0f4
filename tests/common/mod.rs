// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, Utc};
use linked_roles::config::Config;
use linked_roles::routes::create_router;
use linked_roles::{AppState, ClientConfig, LinkedRolesClient, OAuth2Scope, OAuth2Tokens};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "1234";
pub const REDIRECT_URI: &str = "https://example.com/verified-role";

/// Client configuration pointed at a mock Discord API.
///
/// Backoff is shortened so retry tests don't wait on the defaults.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(CLIENT_ID)
        .with_client_secret("client-secret")
        .with_redirect_uri(REDIRECT_URI)
        .with_state_secret(b"test-state-secret".to_vec())
        .with_api_base_url(server.uri())
        .with_retry(3, std::time::Duration::from_millis(10))
}

/// A started client for `config`.
#[allow(dead_code)]
pub async fn started_client(config: ClientConfig) -> LinkedRolesClient {
    let client = LinkedRolesClient::new(config).expect("valid config");
    client.start().await.expect("client starts");
    client
}

/// Token endpoint response body.
#[allow(dead_code)]
pub fn token_json(access: &str, refresh: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
        "refresh_token": refresh,
        "scope": "role_connections.write identify"
    })
}

/// `GET /users/@me` response body.
#[allow(dead_code)]
pub fn user_json(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "discriminator": "0",
        "global_name": "Test User",
        "avatar": null,
        "locale": "en-US"
    })
}

#[allow(dead_code)]
pub fn all_scopes() -> [OAuth2Scope; 2] {
    [OAuth2Scope::Identify, OAuth2Scope::RoleConnectionsWrite]
}

/// Tokens valid for another hour.
#[allow(dead_code)]
pub fn fresh_tokens(access: &str) -> OAuth2Tokens {
    OAuth2Tokens::from_parts(access, "refresh", Utc::now() + Duration::hours(1), all_scopes())
}

/// Tokens whose access token expired a minute ago.
#[allow(dead_code)]
pub fn expired_tokens(access: &str, refresh: &str) -> OAuth2Tokens {
    OAuth2Tokens::from_parts(access, refresh, Utc::now() - Duration::minutes(1), all_scopes())
}

#[allow(dead_code)]
pub fn role_connection_path() -> String {
    format!("/users/@me/applications/{CLIENT_ID}/role-connection")
}

#[allow(dead_code)]
pub fn metadata_path() -> String {
    format!("/applications/{CLIENT_ID}/role-connections/metadata")
}

/// Create a test app backed by a mock Discord API.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app(server: &MockServer) -> (axum::Router, Arc<AppState>) {
    let client_config = test_config(server);
    let config = Config {
        client: client_config.clone(),
        platform_name: "Test Platform".to_string(),
        port: 0,
    };
    let client = started_client(client_config).await;

    let state = Arc::new(AppState::new(config, client));
    let app = create_router(state.clone());
    (app, state)
}
