// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! The state is `base64url("nonce_hex|timestamp_hex|signature_hex")`, where the
//! signature is HMAC-SHA256 over `nonce_hex|timestamp_hex`. Verification
//! needs no server-side storage: a valid signature proves we issued it, the
//! timestamp bounds how long it can be replayed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long an issued state stays valid.
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

const NONCE_LEN: usize = 16;

/// Issues and verifies state tokens with one secret.
#[derive(Clone)]
pub struct OAuthStateSigner {
    key: Vec<u8>,
    rng: SystemRandom,
    max_age: Duration,
}

impl OAuthStateSigner {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            rng: SystemRandom::new(),
            max_age: Duration::seconds(STATE_MAX_AGE_SECS),
        }
    }

    /// Signer with a random 32-byte key; its states only verify in this process.
    pub fn random() -> Result<Self> {
        let rng = SystemRandom::new();
        let mut key = [0u8; 32];
        rng.fill(&mut key)
            .map_err(|_| Error::Internal(anyhow::anyhow!("System RNG failure")))?;
        Ok(Self::new(key.to_vec()))
    }

    pub fn issue(&self) -> Result<String> {
        self.issue_at(Utc::now())
    }

    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| Error::Internal(anyhow::anyhow!("System RNG failure")))?;

        let payload = format!("{}|{:x}", hex::encode(nonce), now.timestamp_millis());
        let signature = hex::encode(self.sign(payload.as_bytes())?);
        Ok(URL_SAFE_NO_PAD.encode(format!("{payload}|{signature}")))
    }

    pub fn verify(&self, state: &str) -> Result<()> {
        self.verify_at(state, Utc::now())
    }

    pub fn verify_at(&self, state: &str, now: DateTime<Utc>) -> Result<()> {
        let decoded = URL_SAFE_NO_PAD
            .decode(state)
            .map_err(|_| Error::InvalidState)?;
        let decoded = String::from_utf8(decoded).map_err(|_| Error::InvalidState)?;

        let parts: Vec<&str> = decoded.splitn(3, '|').collect();
        let [nonce_hex, timestamp_hex, signature_hex] = parts[..] else {
            return Err(Error::InvalidState);
        };

        let payload = format!("{nonce_hex}|{timestamp_hex}");
        let expected = self.sign(payload.as_bytes())?;
        let provided = hex::decode(signature_hex).map_err(|_| Error::InvalidState)?;

        if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            tracing::error!("OAuth state signature mismatch! Potential tampering.");
            return Err(Error::InvalidState);
        }

        let issued_ms = i64::from_str_radix(timestamp_hex, 16).map_err(|_| Error::InvalidState)?;
        let issued_at = DateTime::from_timestamp_millis(issued_ms).ok_or(Error::InvalidState)?;
        if now - issued_at > self.max_age || issued_at - now > Duration::minutes(1) {
            tracing::warn!(issued_at = %issued_at, "OAuth state expired");
            return Err(Error::InvalidState);
        }

        Ok(())
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| Error::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
