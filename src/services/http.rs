// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP transport for the Discord REST API.
//!
//! Handles:
//! - Session lifecycle (`start` / `close`)
//! - Bearer, bot and basic authentication
//! - Rate limit backoff honoring `retry-after`
//! - Retries with exponential backoff for idempotent requests
//! - Typed errors for non-2xx responses

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// An API endpoint relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    timeout: Option<Duration>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Override the client-wide request timeout for this route.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Only these requests are retried after network errors and 5xx responses.
    fn is_idempotent(&self) -> bool {
        self.method == Method::GET
    }
}

/// Credentials attached to a request.
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    Bot(&'a str),
    Basic { id: &'a str, secret: &'a str },
}

/// Request body.
#[derive(Clone, Copy)]
pub enum Body<'a> {
    Empty,
    Json(&'a serde_json::Value),
    Form(&'a [(&'a str, &'a str)]),
}

/// Retry settings for one client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }
}

/// Pooled HTTP session shared by all services of one client.
pub struct HttpClient {
    session: RwLock<Option<reqwest::Client>>,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            session: RwLock::new(None),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Open the connection pool. Calling this on a started client is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut session = self.session.write().await;
        if session.is_none() {
            let client = reqwest::Client::builder()
                .user_agent(format!(
                    "DiscordBot (linked-roles, {})",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()?;
            *session = Some(client);
            tracing::debug!(base_url = %self.base_url, "HTTP session started");
        }
        Ok(())
    }

    /// Drop the connection pool; later requests fail with [`Error::Closed`].
    pub async fn close(&self) {
        if self.session.write().await.take().is_some() {
            tracing::debug!("HTTP session closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.session.read().await.is_none()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        route: &Route,
        auth: Auth<'_>,
        body: Body<'_>,
    ) -> Result<T> {
        let bytes = self.send(route, auth, body).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose response body is not needed.
    pub async fn request_empty(&self, route: &Route, auth: Auth<'_>, body: Body<'_>) -> Result<()> {
        self.send(route, auth, body).await.map(|_| ())
    }

    async fn send(&self, route: &Route, auth: Auth<'_>, body: Body<'_>) -> Result<Vec<u8>> {
        // Clone out of the lock so close() never waits on an in-flight request.
        let session = self.session.read().await.clone().ok_or(Error::Closed)?;
        let url = format!("{}{}", self.base_url, route.path);
        let mut delay = self.retry.initial_backoff;
        let mut attempts = 0;

        loop {
            attempts += 1;
            tracing::debug!(
                attempt = attempts,
                method = %route.method,
                path = %route.path,
                "Making Discord API request"
            );

            let request = self.build(&session, route, &url, auth, body);
            let error = match request.send().await {
                Ok(response) => match Self::handle_response(response).await {
                    Ok(bytes) => {
                        tracing::debug!(
                            method = %route.method,
                            path = %route.path,
                            "Discord API request succeeded"
                        );
                        return Ok(bytes);
                    }
                    Err(e) => e,
                },
                Err(e) => Error::Network(e),
            };

            if attempts >= self.retry.max_attempts || !self.should_retry(route, &error) {
                return Err(error);
            }

            if let Some(retry_after) = error.retry_after() {
                tracing::warn!(
                    attempt = attempts,
                    retry_after_ms = retry_after.as_millis() as u64,
                    path = %route.path,
                    "Rate limited by Discord, waiting before retry"
                );
                tokio::time::sleep(retry_after).await;
            } else {
                tracing::warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    path = %route.path,
                    "Retrying Discord API request"
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, self.retry.max_backoff);
            }
        }
    }

    fn should_retry(&self, route: &Route, error: &Error) -> bool {
        match error {
            // A 429 means the request was not processed, so any method may retry.
            Error::RateLimited { .. } => true,
            _ => route.is_idempotent() && error.is_retryable(),
        }
    }

    fn build(
        &self,
        session: &reqwest::Client,
        route: &Route,
        url: &str,
        auth: Auth<'_>,
        body: Body<'_>,
    ) -> RequestBuilder {
        let mut request = session
            .request(route.method.clone(), url)
            .timeout(route.timeout.unwrap_or(self.timeout));

        request = match auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Bot(token) => request.header(reqwest::header::AUTHORIZATION, format!("Bot {token}")),
            Auth::Basic { id, secret } => request.basic_auth(id, Some(secret)),
        };

        match body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Form(fields) => request.form(fields),
        }
    }

    /// Check response status and return the body or a typed error.
    async fn handle_response(response: reqwest::Response) -> Result<Vec<u8>> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if status.is_success() {
            // 204 and empty 200s decode as JSON null.
            if bytes.is_empty() || status == StatusCode::NO_CONTENT {
                return Ok(b"null".to_vec());
            }
            return Ok(bytes.to_vec());
        }

        Err(Error::from_response(
            status.as_u16(),
            &bytes,
            retry_after.as_deref(),
        ))
    }
}
