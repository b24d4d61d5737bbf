//! Configuration: process settings from the environment and the runtime
//! configuration document.
//!
//! The runtime document is fetched once per process lifetime and cached in
//! memory. A missing or unreadable document falls back to built-in defaults.

use crate::tenant::resolver::LookupFailurePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_IDENTITY_URL: &str = "http://localhost:5000";
const DEFAULT_APP_URL: &str = "http://localhost:4200/";
const CONFIG_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Process settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where to fetch the runtime configuration document over HTTP
    pub runtime_config_url: Option<String>,
    /// Local runtime configuration document (used when no URL is set)
    pub runtime_config_path: Option<PathBuf>,
    /// File backing the durable token storage; in-memory when unset
    pub session_store_path: Option<PathBuf>,
    /// Location the session is resolved against
    pub app_url: String,
    /// What the tenant resolver does when a lookup fails
    pub lookup_policy: LookupFailurePolicy,
}

impl Default for Settings {
    /// Default settings for testing only.
    fn default() -> Self {
        Self {
            runtime_config_url: None,
            runtime_config_path: None,
            session_store_path: None,
            app_url: DEFAULT_APP_URL.to_string(),
            lookup_policy: LookupFailurePolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let lookup_policy = match env::var("TENANT_LOOKUP_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => LookupFailurePolicy::default(),
        };

        Ok(Self {
            runtime_config_url: non_empty_var("RUNTIME_CONFIG_URL"),
            runtime_config_path: non_empty_var("RUNTIME_CONFIG_PATH").map(PathBuf::from),
            session_store_path: non_empty_var("SESSION_STORE_PATH").map(PathBuf::from),
            app_url: non_empty_var("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            lookup_policy,
        })
    }

    /// Where the runtime configuration document comes from.
    pub fn config_source(&self) -> ConfigSource {
        if let Some(url) = &self.runtime_config_url {
            ConfigSource::Url(url.clone())
        } else if let Some(path) = &self.runtime_config_path {
            ConfigSource::File(path.clone())
        } else {
            ConfigSource::Defaults
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Branding colours from the runtime document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
}

/// Runtime configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub identity_server_url: String,
    pub client_id: String,
    /// Multi-tenant mode; when false every session gets the default tenant
    pub tenant_mode: bool,
    pub features: HashMap<String, bool>,
    pub theme: ThemeColors,
    pub version: String,
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            identity_server_url: DEFAULT_IDENTITY_URL.to_string(),
            client_id: "angular-app".to_string(),
            tenant_mode: false,
            features: HashMap::from([
                ("orders".to_string(), true),
                ("products".to_string(), true),
                ("admin".to_string(), false),
            ]),
            theme: ThemeColors {
                primary: "#3f51b5".to_string(),
                secondary: "#ff4081".to_string(),
            },
            version: "1.0.0".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Source of the runtime configuration document.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Url(String),
    File(PathBuf),
    Defaults,
}

/// Loads the runtime configuration document exactly once.
pub struct ConfigLoader {
    source: ConfigSource,
    http: reqwest::Client,
    config: OnceCell<Arc<AppConfig>>,
}

impl ConfigLoader {
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            http: build_http_client(),
            config: OnceCell::new(),
        }
    }

    /// Create a loader that is already loaded with the given document.
    pub fn preloaded(config: AppConfig) -> Self {
        Self {
            source: ConfigSource::Defaults,
            http: build_http_client(),
            config: OnceCell::new_with(Some(Arc::new(config))),
        }
    }

    /// Load the document, or return the cached copy if already loaded.
    ///
    /// Never fails: fetch or parse errors fall back to `AppConfig::default()`.
    pub async fn load(&self) -> Arc<AppConfig> {
        self.config
            .get_or_init(|| async {
                let config = match self.fetch().await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            source = ?self.source,
                            "Failed to load runtime config, using defaults"
                        );
                        AppConfig::default()
                    }
                };
                tracing::info!(
                    version = %config.version,
                    environment = %config.environment,
                    tenant_mode = config.tenant_mode,
                    "Runtime config loaded"
                );
                Arc::new(config)
            })
            .await
            .clone()
    }

    async fn fetch(&self) -> Result<AppConfig, ConfigError> {
        match &self.source {
            ConfigSource::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| ConfigError::Document(e.to_string()))?;
                response
                    .json()
                    .await
                    .map_err(|e| ConfigError::Document(format!("JSON parse error: {}", e)))
            }
            ConfigSource::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| ConfigError::Document(format!("{}: {}", path.display(), e)))?;
                serde_json::from_str(&raw)
                    .map_err(|e| ConfigError::Document(format!("JSON parse error: {}", e)))
            }
            ConfigSource::Defaults => Ok(AppConfig::default()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.config.initialized()
    }

    /// The loaded document, if loading has completed.
    pub fn config(&self) -> Option<Arc<AppConfig>> {
        self.config.get().cloned()
    }

    pub fn feature(&self, name: &str) -> bool {
        self.config
            .get()
            .and_then(|c| c.features.get(name).copied())
            .unwrap_or(false)
    }

    pub fn api_url(&self, endpoint: &str) -> String {
        let base = self
            .config
            .get()
            .map(|c| c.api_base_url.as_str())
            .unwrap_or(DEFAULT_API_BASE_URL);
        join_url(base, endpoint)
    }

    pub fn identity_url(&self, endpoint: &str) -> String {
        let base = self
            .config
            .get()
            .map(|c| c.identity_server_url.as_str())
            .unwrap_or(DEFAULT_IDENTITY_URL);
        join_url(base, endpoint)
    }
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(CONFIG_HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}

fn join_url(base: &str, endpoint: &str) -> String {
    if endpoint.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, endpoint)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Runtime config unavailable: {0}")]
    Document(String),
}
