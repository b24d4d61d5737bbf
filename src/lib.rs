// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Storefront session core: tenant resolution, the authenticated session,
//! shared UI state and the response cache for a multi-tenant storefront
//! client.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod tenant;
pub mod ui;

use auth::{AuthSession, TokenStore};
use cache::{CacheOptions, TtlCache, DEFAULT_SWEEP_INTERVAL};
use config::{ConfigLoader, Settings};
use error::Result;
use models::TenantRecord;
use services::{ApiClient, BackendClient};
use std::sync::{Arc, OnceLock};
use storage::{DurableStorage, FileStorage, MemoryStorage};
use tenant::{RequestLocation, TenantContext, TenantResolver};
use tokio::task::JoinHandle;
use ui::{LoadingIndicator, Notifier};

/// Shared application state.
///
/// Every component is built here and handed its collaborators explicitly.
pub struct AppState {
    pub settings: Settings,
    pub config: Arc<ConfigLoader>,
    pub backend: BackendClient,
    pub tokens: Arc<TokenStore>,
    pub auth: Arc<AuthSession>,
    pub tenant: Arc<TenantContext>,
    pub resolver: TenantResolver,
    pub loading: Arc<LoadingIndicator>,
    pub notifier: Notifier,
    pub cache: Arc<TtlCache<serde_json::Value>>,
    pub api: ApiClient,
    /// Cache sweeper, started by the first `bootstrap`
    sweeper: OnceLock<JoinHandle<()>>,
}

impl AppState {
    /// Build from process settings: file-backed storage when a session store
    /// path is configured, in-memory otherwise.
    pub fn new(settings: Settings) -> Result<Self> {
        let storage: Arc<dyn DurableStorage> = match &settings.session_store_path {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => Arc::new(MemoryStorage::new()),
        };
        let config = ConfigLoader::new(settings.config_source());

        Ok(Self::with_parts(settings, config, storage))
    }

    pub fn with_parts(
        settings: Settings,
        config: ConfigLoader,
        storage: Arc<dyn DurableStorage>,
    ) -> Self {
        let config = Arc::new(config);
        let notifier = Notifier::new();
        let backend = BackendClient::new(config.clone());
        let tokens = Arc::new(TokenStore::new(storage));
        let auth = Arc::new(AuthSession::new(
            backend.clone(),
            tokens.clone(),
            notifier.clone(),
        ));
        let tenant = Arc::new(TenantContext::new());
        let resolver = TenantResolver::new(
            backend.clone(),
            config.clone(),
            tenant.clone(),
            auth.clone(),
            notifier.clone(),
            settings.lookup_policy,
        );
        let loading = Arc::new(LoadingIndicator::new());
        let cache = Arc::new(TtlCache::new(CacheOptions::default()));
        let api = ApiClient::new(
            backend.clone(),
            auth.clone(),
            tenant.clone(),
            loading.clone(),
            notifier.clone(),
            cache.clone(),
        );

        Self {
            settings,
            config,
            backend,
            tokens,
            auth,
            tenant,
            resolver,
            loading,
            notifier,
            cache,
            api,
            sweeper: OnceLock::new(),
        }
    }

    /// Load the runtime configuration, then initialize the session and
    /// resolve the tenant concurrently.
    ///
    /// The two are not ordered: when the token-claim source is needed, the
    /// resolver may run before a stored session has been restored.
    ///
    /// The cache sweeper is started on the first call only.
    pub async fn bootstrap(&self, location: &RequestLocation) -> Arc<TenantRecord> {
        self.config.load().await;

        let ((), tenant) = tokio::join!(self.auth.initialize(), self.resolver.initialize(location));

        self.sweeper
            .get_or_init(|| self.cache.spawn_sweeper(DEFAULT_SWEEP_INTERVAL));
        tenant
    }

    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper.get().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get() {
            handle.abort();
        }
    }
}
