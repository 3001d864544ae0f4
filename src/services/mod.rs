// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - Discord API clients.

pub mod http;
pub mod metadata;
pub mod oauth;
pub mod oauth_state;
pub mod role_connection;
pub mod token_store;

pub use http::{Auth, Body, HttpClient, RetryPolicy, Route};
pub use metadata::MetadataRegistry;
pub use oauth::OAuth2Flow;
pub use oauth_state::OAuthStateSigner;
pub use role_connection::{RoleConnectionClient, RoleConnectionUpdate};
pub use token_store::{TokenStore, DEFAULT_REFRESH_SKEW};
