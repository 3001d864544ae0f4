// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retry and rate limit handling in the HTTP transport.

mod common;

use std::time::{Duration, Instant};

use linked_roles::models::{User, UserPayload};
use linked_roles::{Error, RoleConnection};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rate_limited(retry_after: &str) -> ResponseTemplate {
    ResponseTemplate::new(429)
        .insert_header("retry-after", retry_after)
        .set_body_json(json!({
            "message": "You are being rate limited.",
            "retry_after": retry_after.parse::<f64>().unwrap(),
            "global": false
        }))
}

#[tokio::test]
async fn test_waits_for_retry_after_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(rate_limited("2"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::user_json("42", "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let mut tokens = common::fresh_tokens("access");

    let start = Instant::now();
    let user = client.fetch_user(&mut tokens).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(user.id, "42");
}

#[tokio::test]
async fn test_rate_limit_surfaces_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(rate_limited("0.05"))
        .expect(3)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let mut tokens = common::fresh_tokens("access");

    match client.fetch_user(&mut tokens).await {
        Err(Error::RateLimited {
            retry_after,
            global,
        }) => {
            assert_eq!(retry_after, Duration::from_millis(50));
            assert!(!global);
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_post_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(rate_limited("0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::token_json(
            "access", "refresh", 604800,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    assert!(client.exchange_code("abc").await.is_ok());
}

#[tokio::test]
async fn test_server_error_retried_for_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::user_json("42", "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let mut tokens = common::fresh_tokens("access");
    assert!(client.fetch_user(&mut tokens).await.is_ok());
}

#[tokio::test]
async fn test_server_error_not_retried_for_put() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(common::role_connection_path()))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let payload: UserPayload = serde_json::from_value(common::user_json("42", "alice")).unwrap();
    let mut user = User::new(payload, common::fresh_tokens("access"));
    let connection = RoleConnection::new("Test Platform", "alice").unwrap();

    match client.edit_role_connection(&mut user, &connection).await {
        Err(Error::ServerError { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_timeout_is_retried_then_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::user_json("42", "alice"))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = common::test_config(&server).with_request_timeout(Duration::from_millis(200));
    let client = common::started_client(config).await;
    let mut tokens = common::fresh_tokens("access");

    let start = Instant::now();
    match client.fetch_user(&mut tokens).await {
        Err(Error::Network(e)) => assert!(e.is_timeout()),
        other => panic!("expected network timeout, got {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_post_timeout_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::token_json("access", "refresh", 604800))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = common::test_config(&server).with_request_timeout(Duration::from_millis(200));
    let client = common::started_client(config).await;

    match client.exchange_code("abc").await {
        Err(Error::Network(e)) => assert!(e.is_timeout()),
        other => panic!("expected network timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_numeric_retry_after_falls_back_to_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "NaN")
                .set_body_json(json!({
                    "message": "You are being rate limited.",
                    "retry_after": 0.05,
                    "global": false
                })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::user_json("42", "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let mut tokens = common::fresh_tokens("access");
    assert_eq!(client.fetch_user(&mut tokens).await.unwrap().id, "42");
}
