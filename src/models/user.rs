// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord user model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::role::RoleConnection;
use super::token::OAuth2Tokens;

const CDN_BASE: &str = "https://cdn.discordapp.com";

/// `GET /users/@me` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub bot: Option<bool>,
    #[serde(default)]
    pub system: Option<bool>,
    #[serde(default)]
    pub accent_color: Option<u32>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// An authorized Discord user together with the tokens that authorize it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// `"0"` for accounts migrated to unique usernames.
    pub discriminator: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub bot: bool,
    pub system: bool,
    pub accent_color: Option<u32>,
    pub locale: Option<String>,
    tokens: OAuth2Tokens,
    /// Last role connection read from or written to Discord.
    #[serde(default)]
    role_connection: Option<RoleConnection>,
}

impl User {
    pub fn new(payload: UserPayload, tokens: OAuth2Tokens) -> Self {
        Self {
            id: payload.id,
            username: payload.username,
            discriminator: payload.discriminator.unwrap_or_else(|| "0".to_string()),
            global_name: payload.global_name,
            avatar: payload.avatar,
            banner: payload.banner,
            bot: payload.bot.unwrap_or(false),
            system: payload.system.unwrap_or(false),
            accent_color: payload.accent_color,
            locale: payload.locale,
            tokens,
            role_connection: None,
        }
    }

    /// Refresh profile fields from a newer payload, keeping tokens and cache.
    pub fn update_profile(&mut self, payload: UserPayload) {
        let tokens = self.tokens.clone();
        let role_connection = self.role_connection.take();
        *self = User {
            role_connection,
            ..User::new(payload, tokens)
        };
    }

    pub fn tokens(&self) -> &OAuth2Tokens {
        &self.tokens
    }

    pub(crate) fn tokens_mut(&mut self) -> &mut OAuth2Tokens {
        &mut self.tokens
    }

    /// Give up the user, keeping its tokens (e.g. to revoke them).
    pub fn into_tokens(self) -> OAuth2Tokens {
        self.tokens
    }

    pub fn role_connection(&self) -> Option<&RoleConnection> {
        self.role_connection.as_ref()
    }

    pub(crate) fn set_role_connection(
        &mut self,
        connection: Option<RoleConnection>,
    ) -> Option<RoleConnection> {
        std::mem::replace(&mut self.role_connection, connection)
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("{CDN_BASE}/avatars/{}/{hash}.png?size=1024", self.id))
    }

    pub fn banner_url(&self) -> Option<String> {
        self.banner.as_ref().map(|hash| {
            let format = if hash.starts_with("a_") { "gif" } else { "png" };
            format!("{CDN_BASE}/banners/{}/{hash}.{format}?size=1024", self.id)
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.discriminator == "0" {
            f.write_str(&self.username)
        } else {
            write!(f, "{}#{}", self.username, self.discriminator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(json: serde_json::Value) -> User {
        let payload: UserPayload = serde_json::from_value(json).unwrap();
        User::new(payload, OAuth2Tokens::from_parts("a", "r", Utc::now(), []))
    }

    #[test]
    fn test_display_and_defaults() {
        let legacy = user(serde_json::json!({
            "id": "80351110224678912",
            "username": "Nelly",
            "discriminator": "1337"
        }));
        assert_eq!(legacy.to_string(), "Nelly#1337");
        assert!(!legacy.bot);

        let migrated = user(serde_json::json!({"id": "1", "username": "nelly", "discriminator": "0"}));
        assert_eq!(migrated.to_string(), "nelly");
    }

    #[test]
    fn test_cdn_urls() {
        let u = user(serde_json::json!({
            "id": "42",
            "username": "x",
            "avatar": "abc",
            "banner": "a_def"
        }));
        assert_eq!(
            u.avatar_url().as_deref(),
            Some("https://cdn.discordapp.com/avatars/42/abc.png?size=1024")
        );
        assert_eq!(
            u.banner_url().as_deref(),
            Some("https://cdn.discordapp.com/banners/42/a_def.gif?size=1024")
        );
    }

    #[test]
    fn test_update_profile_keeps_tokens() {
        let mut u = user(serde_json::json!({"id": "42", "username": "old"}));
        let payload: UserPayload =
            serde_json::from_value(serde_json::json!({"id": "42", "username": "new"})).unwrap();
        u.update_profile(payload);
        assert_eq!(u.username, "new");
        assert_eq!(u.tokens().access_token(), "a");
    }
}
