// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 scopes and token pairs.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::time_utils::expiry_from_ttl;

/// An OAuth2 scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OAuth2Scope {
    Identify,
    Email,
    Guilds,
    RoleConnectionsWrite,
    /// Any scope this crate has no variant for.
    Other(String),
}

impl OAuth2Scope {
    pub fn as_str(&self) -> &str {
        match self {
            OAuth2Scope::Identify => "identify",
            OAuth2Scope::Email => "email",
            OAuth2Scope::Guilds => "guilds",
            OAuth2Scope::RoleConnectionsWrite => "role_connections.write",
            OAuth2Scope::Other(s) => s,
        }
    }

    /// Parse a space separated scope list, as found in token responses.
    pub fn parse_list(value: &str) -> Vec<OAuth2Scope> {
        value
            .split_whitespace()
            .map(|s| OAuth2Scope::from(s.to_string()))
            .collect()
    }

    /// Space separated form used in the authorization URL.
    pub fn join(scopes: &[OAuth2Scope]) -> String {
        scopes
            .iter()
            .map(OAuth2Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<String> for OAuth2Scope {
    fn from(value: String) -> Self {
        match value.as_str() {
            "identify" => OAuth2Scope::Identify,
            "email" => OAuth2Scope::Email,
            "guilds" => OAuth2Scope::Guilds,
            "role_connections.write" => OAuth2Scope::RoleConnectionsWrite,
            _ => OAuth2Scope::Other(value),
        }
    }
}

impl FromStr for OAuth2Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OAuth2Scope::from(s.to_string()))
    }
}

impl fmt::Display for OAuth2Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OAuth2Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OAuth2Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(OAuth2Scope::from)
    }
}

/// Token response from `POST /oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// An access/refresh token pair belonging to one user.
///
/// `expires_at` is computed once from the issuance time and the server TTL.
/// A refresh produces a whole new value; nothing mutates an existing pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Tokens {
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    scopes: BTreeSet<OAuth2Scope>,
}

impl OAuth2Tokens {
    /// Build tokens from a token endpoint response received at `issued_at`.
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            expires_at: expiry_from_ttl(issued_at, response.expires_in),
            scopes: OAuth2Scope::parse_list(&response.scope).into_iter().collect(),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
        }
    }

    /// Restore a previously stored pair.
    pub fn from_parts(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        scopes: impl IntoIterator<Item = OAuth2Scope>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
            expires_at,
            scopes: scopes.into_iter().collect(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn scopes(&self) -> &BTreeSet<OAuth2Scope> {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &OAuth2Scope) -> bool {
        self.scopes.contains(scope)
    }

    /// True when `now + skew >= expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::zero());
        now + skew >= self.expires_at
    }

    pub fn is_expired(&self, skew: Duration) -> bool {
        self.is_expired_at(Utc::now(), skew)
    }
}

// Tokens are secrets; keep them out of logs.
impl fmt::Debug for OAuth2Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Tokens")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
