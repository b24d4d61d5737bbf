//! Tenant record model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Identifier of the built-in tenant used when nothing else resolves.
pub const DEFAULT_TENANT_ID: &str = "default";

/// Tenant branding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub primary: String,
    pub secondary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Per-tenant feature flags and free-form settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub features: HashMap<String, bool>,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

/// Tenant record, read-only on the client side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    /// Custom domain, when the tenant has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Branding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TenantConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl TenantRecord {
    /// The hard-coded fallback tenant.
    pub fn default_tenant() -> Self {
        Self {
            id: DEFAULT_TENANT_ID.to_string(),
            name: "Default Tenant".to_string(),
            domain: None,
            theme: Some(Branding {
                primary: "#3f51b5".to_string(),
                secondary: "#ff4081".to_string(),
                logo: None,
            }),
            config: Some(TenantConfig {
                features: HashMap::from([
                    ("orders".to_string(), true),
                    ("products".to_string(), true),
                    ("admin".to_string(), false),
                ]),
                settings: HashMap::new(),
            }),
            metadata: None,
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_TENANT_ID
    }

    /// Feature flag value; absent flags are off.
    pub fn feature(&self, name: &str) -> bool {
        self.config
            .as_ref()
            .and_then(|c| c.features.get(name).copied())
            .unwrap_or(false)
    }

    pub fn setting(&self, name: &str) -> Option<&Value> {
        self.config.as_ref().and_then(|c| c.settings.get(name))
    }
}
