// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User role connection tests.

mod common;

use chrono::{TimeZone, Utc};
use linked_roles::models::{User, UserPayload};
use linked_roles::{Error, LinkedRolesClient, MetadataValue, RoleConnection};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schema_json() -> serde_json::Value {
    json!([
        {"type": 2, "key": "matches", "name": "Matches", "description": "..."},
        {"type": 5, "key": "last_update", "name": "Last Update", "description": "..."},
        {"type": 7, "key": "verified", "name": "Verified", "description": "..."}
    ])
}

fn connection_json() -> serde_json::Value {
    json!({
        "platform_name": "Test Platform",
        "platform_username": "alice",
        "metadata": {
            "matches": "10",
            "verified": "1",
            "last_update": "2026-01-02T03:04:05Z"
        }
    })
}

fn user() -> User {
    let payload: UserPayload = serde_json::from_value(common::user_json("42", "alice")).unwrap();
    User::new(payload, common::fresh_tokens("access"))
}

fn connection() -> RoleConnection {
    let mut connection = RoleConnection::new("Test Platform", "alice").unwrap();
    connection
        .add_metadata("matches", 10)
        .unwrap()
        .add_metadata("verified", true)
        .unwrap()
        .add_metadata(
            "last_update",
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        )
        .unwrap();
    connection
}

/// A started client whose schema cache holds [`schema_json`].
async fn client_with_schema(server: &MockServer) -> LinkedRolesClient {
    Mock::given(method("GET"))
        .and(path(common::metadata_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(schema_json()))
        .mount(server)
        .await;

    let client =
        common::started_client(common::test_config(server).with_bot_token("bot-token")).await;
    assert!(client.is_role_metadata_fetched());
    client
}

#[tokio::test]
async fn test_edit_then_fetch_round_trips_values() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(common::role_connection_path()))
        .and(header("authorization", "Bearer access"))
        .and(body_json(connection_json()))
        .respond_with(ResponseTemplate::new(200).set_body_json(connection_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(common::role_connection_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(connection_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_schema(&server).await;
    let mut user = user();

    let written = client
        .edit_role_connection(&mut user, &connection())
        .await
        .unwrap();
    let read = client.fetch_role_connection(&mut user).await.unwrap().unwrap();

    assert_eq!(written, connection());
    assert_eq!(read, written);
    assert_eq!(
        read.get_metadata("verified"),
        Some(&MetadataValue::Boolean(true))
    );
    assert_eq!(user.role_connection(), Some(&read));
}

#[tokio::test]
async fn test_edit_checks_values_against_schema() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(common::role_connection_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(connection_json()))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_with_schema(&server).await;
    let mut user = user();

    let mut unregistered = RoleConnection::new("Test Platform", "alice").unwrap();
    unregistered.add_metadata("winrate", 50).unwrap();
    assert!(matches!(
        client.edit_role_connection(&mut user, &unregistered).await,
        Err(Error::Validation { .. })
    ));

    let mut wrong_kind = RoleConnection::new("Test Platform", "alice").unwrap();
    wrong_kind.add_metadata("verified", 1).unwrap();
    assert!(matches!(
        client.edit_role_connection(&mut user, &wrong_kind).await,
        Err(Error::Validation { .. })
    ));

    assert!(user.role_connection().is_none());
}

#[tokio::test]
async fn test_missing_connection_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(common::role_connection_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Unknown Application",
            "code": 10002
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let mut user = user();
    assert!(client.fetch_role_connection(&mut user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_values_inferred_without_schema() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(common::role_connection_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(connection_json()))
        .mount(&server)
        .await;

    let client = common::started_client(common::test_config(&server)).await;
    let mut user = user();
    let read = client.fetch_role_connection(&mut user).await.unwrap().unwrap();

    assert_eq!(read.platform_username(), "alice");
    assert_eq!(read.get_metadata("matches"), Some(&MetadataValue::Integer(10)));
    // Without a schema a boolean "1" can't be told apart from an integer.
    assert_eq!(read.get_metadata("verified"), Some(&MetadataValue::Integer(1)));
    assert_eq!(
        read.get_metadata("last_update"),
        Some(&MetadataValue::DateTime(
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
        ))
    );
}

#[tokio::test]
async fn test_edit_publishes_update() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(common::role_connection_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(connection_json()))
        .mount(&server)
        .await;

    let client = client_with_schema(&server).await;
    let mut updates = client.subscribe_updates();
    let mut user = user();

    client
        .edit_role_connection(&mut user, &connection())
        .await
        .unwrap();

    let update = updates.recv().await.unwrap();
    assert_eq!(update.user_id, "42");
    assert!(update.before.is_none());
    assert_eq!(update.after, connection());

    client
        .edit_role_connection(&mut user, &connection())
        .await
        .unwrap();
    let update = updates.recv().await.unwrap();
    assert_eq!(update.before, Some(connection()));
}

#[tokio::test]
async fn test_write_requires_role_connections_scope() {
    let server = MockServer::start().await;
    let config = common::test_config(&server)
        .with_scopes([linked_roles::OAuth2Scope::Identify]);
    let client = common::started_client(config).await;
    let mut user = user();

    assert!(matches!(
        client.edit_role_connection(&mut user, &connection()).await,
        Err(Error::ScopeMissing(linked_roles::OAuth2Scope::RoleConnectionsWrite))
    ));
}
