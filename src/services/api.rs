// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated client for application API calls.
//!
//! Every call goes through the same steps:
//! - attach `Authorization` and `X-Tenant-ID` headers
//! - hold the loading indicator for the whole call, retry included
//! - on a 401, refresh the access token once and retry
//! - raise a user notice for any failure that reaches the caller

use crate::auth::AuthSession;
use crate::cache::TtlCache;
use crate::error::{AppError, Result};
use crate::models::PaginatedResponse;
use crate::services::backend::{error_for, BackendClient};
use crate::tenant::context::TenantContext;
use crate::ui::{LoadingIndicator, Notifier};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const TENANT_HEADER: &str = "X-Tenant-ID";

const NO_AUTH_PATHS: [&str; 3] = ["/auth/login", "/auth/refresh", "/public/"];
const NO_REFRESH_PATHS: [&str; 2] = ["/auth/login", "/auth/refresh"];
const NO_LOADING_PATHS: [&str; 3] = ["/auth/refresh", "/heartbeat", "/ping"];

fn matches_any(url: &str, paths: &[&str]) -> bool {
    paths.iter().any(|p| url.contains(p))
}

/// Per-request query parameters and extra headers.
///
/// `Authorization` and `X-Tenant-ID` are managed by the client; extra headers
/// with those names are ignored.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    backend: BackendClient,
    auth: Arc<AuthSession>,
    tenant: Arc<TenantContext>,
    loading: Arc<LoadingIndicator>,
    notifier: Notifier,
    cache: Arc<TtlCache<Value>>,
}

impl ApiClient {
    pub fn new(
        backend: BackendClient,
        auth: Arc<AuthSession>,
        tenant: Arc<TenantContext>,
        loading: Arc<LoadingIndicator>,
        notifier: Notifier,
        cache: Arc<TtlCache<Value>>,
    ) -> Self {
        Self {
            backend,
            auth,
            tenant,
            loading,
            notifier,
            cache,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.get_with(endpoint, &RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        self.call(Method::GET, endpoint, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let body = to_body(body)?;
        self.call(Method::POST, endpoint, Some(body), &RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let body = to_body(body)?;
        self.call(Method::PUT, endpoint, Some(body), &RequestOptions::default())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let body = to_body(body)?;
        self.call(Method::PATCH, endpoint, Some(body), &RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.call(Method::DELETE, endpoint, None, &RequestOptions::default())
            .await
    }

    /// One page of `endpoint`, with `page` and `pageSize` added to the query.
    ///
    /// Paging parameters already present in `options` are replaced.
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
        page_size: u32,
        options: &RequestOptions,
    ) -> Result<PaginatedResponse<T>> {
        let mut options = options.clone();
        options
            .query
            .retain(|(name, _)| name != "page" && name != "pageSize");
        let options = options
            .query_param("page", page.to_string())
            .query_param("pageSize", page_size.to_string());

        self.get_with(endpoint, &options).await
    }

    /// `GET` served from the response cache while fresh.
    ///
    /// Entries are keyed per tenant; failures are never cached.
    pub async fn get_cached(&self, endpoint: &str, ttl: Option<Duration>) -> Result<Value> {
        let key = self.cache_key(endpoint);
        self.cache
            .get_or_try_insert_with(&key, ttl, || self.get::<Value>(endpoint))
            .await
    }

    /// Drop cached responses for `endpoint` under every tenant.
    pub fn invalidate_cached(&self, endpoint: &str) -> usize {
        let suffix = format!("|{}", endpoint);
        self.cache.clear_matching(|key| key.ends_with(&suffix))
    }

    fn cache_key(&self, endpoint: &str) -> String {
        format!("{}|{}", self.tenant.tenant_id().unwrap_or_default(), endpoint)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<T> {
        let url = self.backend.config().api_url(endpoint);

        let _loading = (!matches_any(&url, &NO_LOADING_PATHS)).then(|| self.loading.acquire(None));

        let result = self
            .send_with_refresh(&method, &url, body.as_ref(), options)
            .await;
        if let Err(e) = &result {
            self.report(e, &url).await;
        }
        result
    }

    async fn send_with_refresh<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<T> {
        let sent_token = self.auth.tokens().access_token();
        let response = self.send(method, url, body, options).await?;

        let refreshable = response.status() == reqwest::StatusCode::UNAUTHORIZED
            && !matches_any(url, &NO_REFRESH_PATHS)
            && self.auth.tokens().refresh_token().is_some();
        if !refreshable {
            return decode(response).await;
        }

        tracing::debug!(url, "Access token rejected, refreshing");
        if self.auth.refresh_if_stale(sent_token.as_deref()).await.is_none() {
            return Err(AppError::SessionExpired);
        }

        let retried = self.send(method, url, body, options).await?;
        decode(retried).await
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .backend
            .http()
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            if is_managed_header(name) {
                tracing::debug!(header = %name, "Ignoring caller-supplied managed header");
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        if !matches_any(url, &NO_AUTH_PATHS) {
            if let Some(authorization) = self.auth.tokens().authorization_header() {
                request = request.header(AUTHORIZATION, authorization);
            }
        }
        if let Some(tenant_id) = self.tenant.tenant_id() {
            request = request.header(TENANT_HEADER, tenant_id);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    async fn report(&self, error: &AppError, url: &str) {
        tracing::warn!(url, error = %error, "API call failed");

        match error {
            // The failed refresh has already signed the user out.
            AppError::SessionExpired => {
                self.notifier.error(AppError::SESSION_EXPIRED_NOTICE);
            }
            AppError::Unauthorized => {
                if !url.contains("/auth/refresh") {
                    self.notifier.error(AppError::SESSION_EXPIRED_NOTICE);
                    self.auth.logout().await;
                }
            }
            other => {
                if let Some(notice) = other.user_notice() {
                    self.notifier.error(notice);
                }
            }
        }
    }
}

fn is_managed_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) || name.eq_ignore_ascii_case(TENANT_HEADER)
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| AppError::BadRequest(format!("Unserializable body: {}", e)))
}

/// Parse a successful response; an empty body reads as JSON `null`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_for(response).await);
    }

    let bytes = response.bytes().await?;
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(body).map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
}
