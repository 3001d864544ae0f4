// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application role connection metadata schema.
//!
//! Discord replaces the whole schema on every PUT, so [`MetadataRegistry::register`]
//! always sends the complete record set. The last schema seen is cached so
//! role connection edits can be type-checked before they are sent.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::instrument;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{Error, Result};
use crate::models::role::MAX_METADATA;
use crate::models::{MetadataKind, RoleConnection, RoleMetadataRecord, RoleMetadataRecordPayload};
use crate::services::http::{Auth, Body, HttpClient, Route};

pub struct MetadataRegistry {
    http: Arc<HttpClient>,
    application_id: String,
    bot_token: Option<String>,
    client_secret: Option<String>,
    records: DashMap<String, RoleMetadataRecord>,
    fetched: AtomicBool,
}

impl MetadataRegistry {
    pub fn new(http: Arc<HttpClient>, config: &ClientConfig) -> Self {
        Self {
            http,
            application_id: config.client_id.clone(),
            bot_token: config.bot_token.clone(),
            client_secret: config.client_secret.clone(),
            records: DashMap::new(),
            fetched: AtomicBool::new(false),
        }
    }

    fn route_path(&self) -> String {
        format!(
            "/applications/{}/role-connections/metadata",
            urlencoding::encode(&self.application_id)
        )
    }

    /// Bot token if configured, else the application's client credentials.
    fn auth(&self) -> Result<Auth<'_>> {
        if let Some(token) = &self.bot_token {
            return Ok(Auth::Bot(token));
        }
        match &self.client_secret {
            Some(secret) => Ok(Auth::Basic {
                id: &self.application_id,
                secret,
            }),
            None => Err(Error::Config(ConfigError::Missing("bot_token"))),
        }
    }

    /// Replace the application's schema with `records`.
    ///
    /// Records are checked locally first (duplicate keys, count); nothing is
    /// sent if that fails and the cached schema is left alone.
    #[instrument(skip_all, fields(count = records.len()))]
    pub async fn register(&self, records: &[RoleMetadataRecord]) -> Result<Vec<RoleMetadataRecord>> {
        validate_schema(records)?;

        let payload: Vec<RoleMetadataRecordPayload> =
            records.iter().cloned().map(Into::into).collect();
        let body = serde_json::to_value(&payload)?;

        let echoed: Vec<RoleMetadataRecordPayload> = self
            .http
            .request(&Route::put(self.route_path()), self.auth()?, Body::Json(&body))
            .await?;

        let registered = into_records(echoed)?;
        self.replace_cache(&registered);
        tracing::info!(count = registered.len(), "Role metadata registered");
        Ok(registered)
    }

    /// Fetch the current schema and refresh the cache.
    #[instrument(skip_all)]
    pub async fn list(&self) -> Result<Vec<RoleMetadataRecord>> {
        let payload: Vec<RoleMetadataRecordPayload> = self
            .http
            .request(&Route::get(self.route_path()), self.auth()?, Body::Empty)
            .await?;

        let records = into_records(payload)?;
        self.replace_cache(&records);
        Ok(records)
    }

    /// Cached record for `key`.
    pub fn get(&self, key: &str) -> Option<RoleMetadataRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    pub fn kind_of(&self, key: &str) -> Option<MetadataKind> {
        self.records.get(key).map(|r| r.value_kind())
    }

    /// Whether a schema has been fetched or registered since the last clear.
    pub fn is_fetched(&self) -> bool {
        self.fetched.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.records.clear();
        self.fetched.store(false, Ordering::Release);
    }

    /// Check a connection's values against the cached schema.
    ///
    /// Passes trivially when no schema has been fetched yet.
    pub fn check_connection(&self, connection: &RoleConnection) -> Result<()> {
        if !self.is_fetched() {
            return Ok(());
        }

        for (key, value) in connection.metadata() {
            let Some(kind) = self.kind_of(key) else {
                return Err(Error::validation(format!(
                    "Role metadata {key:?} is not registered"
                )));
            };
            if value.kind() != kind {
                return Err(Error::validation(format!(
                    "Role metadata {key:?} value must be {kind:?}, got {:?}",
                    value.kind()
                )));
            }
        }
        Ok(())
    }

    fn replace_cache(&self, records: &[RoleMetadataRecord]) {
        self.records.clear();
        for record in records {
            self.records.insert(record.key().to_string(), record.clone());
        }
        self.fetched.store(true, Ordering::Release);
    }
}

fn validate_schema(records: &[RoleMetadataRecord]) -> Result<()> {
    if records.len() > MAX_METADATA {
        return Err(Error::validation(format!(
            "An application can have at most {MAX_METADATA} metadata records"
        )));
    }

    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.key()) {
            return Err(Error::validation(format!(
                "Role metadata with key {:?} appears more than once",
                record.key()
            )));
        }
    }
    Ok(())
}

fn into_records(payload: Vec<RoleMetadataRecordPayload>) -> Result<Vec<RoleMetadataRecord>> {
    payload.into_iter().map(RoleMetadataRecord::try_from).collect()
}
