// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use linked_roles::{ConfigError, Error, OAuth2Scope};
use serde_json::Value;

async fn render(err: Error) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_rate_limit_response_carries_retry_after() {
    let (status, body) = render(Error::RateLimited {
        retry_after: Duration::from_millis(1500),
        global: true,
    })
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["retry_after"], 1.5);
}

#[tokio::test]
async fn test_client_errors_keep_message() {
    let (status, body) = render(Error::validation("Key must be lowercase")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Key must be lowercase");

    let (status, body) = render(Error::ScopeMissing(OAuth2Scope::RoleConnectionsWrite)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "role_connections.write");
}

#[tokio::test]
async fn test_upstream_failures_are_bad_gateway() {
    let (status, body) = render(Error::ServerError {
        status: 503,
        message: "upstream connect error".to_string(),
    })
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "discord_error");
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let (status, body) = render(Error::Config(ConfigError::Missing("client_secret"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("message").is_none());
}

#[test]
fn test_reauthorization_errors() {
    assert!(Error::Unauthorized {
        message: "401: Unauthorized".to_string()
    }
    .requires_reauthorization());
    assert!(!Error::NotFound {
        message: "Unknown User".to_string()
    }
    .requires_reauthorization());
    assert_eq!(Error::Closed.status(), None);
    assert_eq!(
        Error::from_response(404, br#"{"message":"Unknown User","code":10013}"#, None).status(),
        Some(404)
    );
}
