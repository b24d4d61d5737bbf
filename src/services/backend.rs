// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend client for the tenant and identity endpoints.
//!
//! Base URLs are read from the runtime configuration at request time, so a
//! client built before the configuration finishes loading still targets the
//! right hosts once it has.

use crate::config::ConfigLoader;
use crate::error::AppError;
use crate::models::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TenantRecord, User,
};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Backend API client.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: Arc<ConfigLoader>,
}

impl BackendClient {
    pub fn new(config: Arc<ConfigLoader>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Shared HTTP connection pool.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Fetch a tenant record by identifier.
    pub async fn get_tenant(&self, tenant_id: &str) -> Result<TenantRecord, AppError> {
        let url = self.config.api_url(&format!(
            "tenants/{}",
            urlencoding::encode(tenant_id)
        ));

        let response = self.http.get(&url).send().await?;
        check_response_json(response).await
    }

    /// Exchange credentials for a token pair.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AppError> {
        let response = self
            .http
            .post(self.config.identity_url("auth/login"))
            .json(request)
            .send()
            .await?;

        check_response_json(response).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AppError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };

        let response = self
            .http
            .post(self.config.identity_url("auth/refresh"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Token refresh request failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Tell the identity server the session has ended.
    pub async fn logout(&self) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.config.identity_url("auth/logout"))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        check_response(response).await
    }

    /// Load the profile of the user owning `authorization` (`"<type> <token>"`).
    pub async fn me(&self, authorization: &str) -> Result<User, AppError> {
        let response = self
            .http
            .get(self.config.api_url("auth/me"))
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        check_response_json(response).await
    }
}

/// Map a non-success status to the matching `AppError`.
pub(crate) async fn error_for(response: reqwest::Response) -> AppError {
    let status = response.status();
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 => AppError::Unauthorized,
        404 => AppError::NotFound(url),
        code => {
            tracing::debug!(status = code, url = %url, "Backend request failed");
            AppError::Http { status: code, body }
        }
    }
}

/// Check response status and return error if not successful.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_for(response).await)
}

/// Check response and parse JSON body.
pub(crate) async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(error_for(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
}
