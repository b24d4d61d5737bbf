// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token store.
//!
//! The access token lives only in process memory. The refresh token, the
//! expiry and the token type go to durable storage.

use crate::error::Result;
use crate::storage::{keys, DurableStorage};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Margin before expiry at which a token is already treated as expired (5 minutes).
pub const EXPIRY_MARGIN_MS: i64 = 5 * 60 * 1000;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Tokens handed to [`TokenStore::set_tokens`].
#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: Option<String>,
}

struct InMemoryTokens {
    access_token: Option<String>,
    token_type: String,
}

pub struct TokenStore {
    storage: Arc<dyn DurableStorage>,
    memory: RwLock<InMemoryTokens>,
}

impl TokenStore {
    /// Create a store; only the token type is restored from durable storage.
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        let token_type = storage
            .get(keys::TOKEN_TYPE)
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());

        Self {
            storage,
            memory: RwLock::new(InMemoryTokens {
                access_token: None,
                token_type,
            }),
        }
    }

    pub fn set_tokens(&self, data: TokenData) -> Result<()> {
        let token_type = data
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());

        if let Some(refresh_token) = &data.refresh_token {
            self.storage.set(keys::REFRESH_TOKEN, refresh_token)?;
        }
        if let Some(expires_at) = data.expires_at {
            self.storage
                .set(keys::EXPIRES_AT, &expires_at.timestamp_millis().to_string())?;
        }
        self.storage.set(keys::TOKEN_TYPE, &token_type)?;

        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        memory.access_token = Some(data.access_token);
        memory.token_type = token_type;
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    /// Set the access token obtained out of band (e.g. from an HTTP-only cookie).
    pub fn set_access_token_from_secure_source(&self, token: impl Into<String>) {
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token = Some(token.into());
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage
            .get(keys::REFRESH_TOKEN)
            .filter(|t| !t.is_empty())
    }

    pub fn token_type(&self) -> String {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token_type
            .clone()
    }

    /// `"<type> <token>"`, or `None` without an access token.
    pub fn authorization_header(&self) -> Option<String> {
        let memory = self.memory.read().unwrap_or_else(PoisonError::into_inner);
        memory
            .access_token
            .as_ref()
            .map(|token| format!("{} {}", memory.token_type, token))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.storage
            .get(keys::EXPIRES_AT)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    pub fn is_token_expired(&self) -> bool {
        self.is_token_expired_at(Utc::now())
    }

    /// Expired when no expiry is stored, or once `now >= expires_at - 5min`.
    pub fn is_token_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at - Duration::milliseconds(EXPIRY_MARGIN_MS),
            None => true,
        }
    }

    pub fn has_valid_token(&self) -> bool {
        self.access_token().is_some() && !self.is_token_expired()
    }

    /// Drop the in-memory access token if it has expired, keeping the refresh
    /// token. Returns whether a token was dropped.
    pub fn discard_expired_access_token(&self) -> bool {
        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        if memory.access_token.is_none() || !self.is_token_expired() {
            return false;
        }
        memory.access_token = None;
        true
    }

    /// Forget every token. The in-memory token is cleared even if storage fails.
    pub fn clear_tokens(&self) -> Result<()> {
        {
            let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
            memory.access_token = None;
            memory.token_type = DEFAULT_TOKEN_TYPE.to_string();
        }

        for key in [
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::EXPIRES_AT,
            keys::TOKEN_TYPE,
        ] {
            self.storage.remove(key)?;
        }
        Ok(())
    }
}
