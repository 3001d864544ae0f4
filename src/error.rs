// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error taxonomy shared by every client operation.
//!
//! Non-2xx responses from Discord are classified by [`Error::from_response`];
//! the demo server renders any [`Error`] as a JSON response.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::models::OAuth2Scope;

/// Errors returned by the linked roles client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure: connect error, timeout, or a body that could not be read.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401, or client credentials rejected by the token endpoint.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The authorization code was rejected (expired, reused, or redirect_uri mismatch).
    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Malformed request, reported either locally or by Discord (400/422).
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Still rate limited after the configured number of attempts.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration, global: bool },

    #[error("Discord server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Scope is missing: {0}")]
    ScopeMissing(OAuth2Scope),

    #[error("Invalid or tampered OAuth state")]
    InvalidState,

    #[error("Client is closed")]
    Closed,

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error body shapes Discord uses: REST errors carry `message`/`code`/`errors`,
/// the OAuth2 endpoints carry `error`/`error_description`.
#[derive(Debug, Default, Deserialize)]
struct DiscordErrorBody {
    message: Option<String>,
    code: Option<i64>,
    errors: Option<serde_json::Value>,
    error: Option<String>,
    error_description: Option<String>,
    retry_after: Option<f64>,
    global: Option<bool>,
}

impl Error {
    /// Shorthand for a locally detected validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Classify a non-2xx response.
    ///
    /// `retry_after_header` is the raw `retry-after` header value, if any; it
    /// takes precedence over the `retry_after` field of the body.
    pub fn from_response(status: u16, body: &[u8], retry_after_header: Option<&str>) -> Self {
        let parsed: Option<DiscordErrorBody> = serde_json::from_slice(body).ok();
        let is_json = parsed.is_some();
        let parsed = parsed.unwrap_or_default();

        let message = parsed
            .error_description
            .clone()
            .or_else(|| parsed.message.clone())
            .or_else(|| parsed.error.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

        if status == 429 {
            let retry_after = retry_after_header
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .or(parsed.retry_after.filter(|v| v.is_finite()))
                .unwrap_or(1.0)
                .clamp(0.0, 3600.0);
            return Error::RateLimited {
                retry_after: Duration::from_secs_f64(retry_after),
                // A non-JSON 429 comes from Cloudflare rather than the API.
                global: parsed.global.unwrap_or(!is_json),
            };
        }

        match parsed.error.as_deref() {
            Some("invalid_grant") => return Error::InvalidGrant { message },
            Some("invalid_client") | Some("unauthorized_client") => {
                return Error::Unauthorized { message }
            }
            _ => {}
        }

        match status {
            400 | 422 => Error::Validation {
                message: match parsed.code {
                    Some(code) => format!("{message} (code {code})"),
                    None => message,
                },
                details: parsed.errors,
            },
            401 => Error::Unauthorized { message },
            404 => Error::NotFound { message },
            s if s >= 500 => Error::ServerError { status: s, message },
            s => Error::Http { status: s, message },
        }
    }

    /// HTTP status that produced this error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            Error::Unauthorized { .. } => Some(401),
            Error::NotFound { .. } => Some(404),
            Error::RateLimited { .. } => Some(429),
            Error::ServerError { status, .. } | Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the transport may retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::RateLimited { .. } | Error::ServerError { .. } => true,
            _ => false,
        }
    }

    /// Server-requested delay before retrying.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// True when the user must go through the authorization flow again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Error::Unauthorized { .. } | Error::InvalidGrant { .. })
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<f64>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Error::Unauthorized { message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", Some(message.clone()))
            }
            Error::InvalidGrant { message } => {
                (StatusCode::UNAUTHORIZED, "invalid_grant", Some(message.clone()))
            }
            Error::InvalidState => (StatusCode::BAD_REQUEST, "invalid_state", None),
            Error::NotFound { message } => {
                (StatusCode::NOT_FOUND, "not_found", Some(message.clone()))
            }
            Error::Validation { message, .. } => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(message.clone()))
            }
            Error::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None),
            Error::ScopeMissing(scope) => (
                StatusCode::FORBIDDEN,
                "scope_missing",
                Some(scope.to_string()),
            ),
            Error::Network(_) | Error::ServerError { .. } | Error::Http { .. } => {
                tracing::warn!(error = %self, "Discord request failed");
                (StatusCode::BAD_GATEWAY, "discord_error", Some(self.to_string()))
            }
            Error::Decode(_) | Error::Closed | Error::Config(_) | Error::Internal(_) => {
                tracing::error!(error = %self, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error,
            message,
            retry_after: self.retry_after().map(|d| d.as_secs_f64()),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
