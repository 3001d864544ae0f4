// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked-Roles: Discord linked roles from Rust
//!
//! This crate wraps Discord's linked roles OAuth2 flow and the role
//! connection metadata endpoints, and ships a small axum server showing
//! how to host the flow.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

pub use client::LinkedRolesClient;
pub use config::{ClientConfig, Config, ConfigError};
pub use error::{Error, Result};
pub use models::{
    MetadataKind, MetadataType, MetadataValue, OAuth2Scope, OAuth2Tokens, RoleConnection,
    RoleMetadataRecord, User,
};
pub use services::RoleConnectionUpdate;

/// Shared state of the demo server.
pub struct AppState {
    pub config: Config,
    pub client: LinkedRolesClient,
    /// Linked users by id. Each user sits behind its own lock so two
    /// requests for the same user never refresh its tokens concurrently.
    pub users: DashMap<String, Arc<Mutex<User>>>,
}

impl AppState {
    pub fn new(config: Config, client: LinkedRolesClient) -> Self {
        Self {
            config,
            client,
            users: DashMap::new(),
        }
    }

    pub fn user(&self, id: &str) -> Option<Arc<Mutex<User>>> {
        self.users.get(id).map(|u| u.value().clone())
    }
}
