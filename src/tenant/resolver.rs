// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tenant resolution.
//!
//! Identification sources, highest priority first:
//! 1. `?tenant=<id>` query parameter
//! 2. `/t/<id>/...` or `/tenant/<id>/...` path prefix
//! 3. Subdomain label (ignoring `www`, `app`, `localhost`)
//! 4. Tenant claim of the signed-in user
//! 5. The built-in default tenant
//!
//! Resolution never fails toward the caller: lookup errors end in the
//! default tenant.

use crate::auth::AuthSession;
use crate::config::{ConfigError, ConfigLoader};
use crate::error::{AppError, Result};
use crate::models::TenantRecord;
use crate::services::BackendClient;
use crate::tenant::context::TenantContext;
use crate::ui::Notifier;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use url::{Host, Url};

const TENANT_QUERY_PARAM: &str = "tenant";
const TENANT_PATH_PREFIXES: [&str; 2] = ["t", "tenant"];
const RESERVED_SUBDOMAINS: [&str; 3] = ["www", "app", "localhost"];

// ─────────────────────────────────────────────────────────────────────────────
// Request Location
// ─────────────────────────────────────────────────────────────────────────────

/// The URL a session is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLocation {
    url: Url,
}

impl RequestLocation {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Replace the path in place, keeping scheme, host and query.
    pub fn replace_path(&mut self, path: &str) {
        self.url.set_path(path);
    }

    /// Non-empty value of the `tenant` query parameter.
    pub fn query_tenant(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(name, _)| name == TENANT_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|v| !v.is_empty())
    }

    fn path_tenant(&self) -> Option<String> {
        let mut segments = self.url.path_segments()?;
        let prefix = segments.next()?;
        if !TENANT_PATH_PREFIXES.contains(&prefix) {
            return None;
        }
        let raw = segments.next().filter(|s| !s.is_empty())?;
        Some(
            urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string()),
        )
    }

    /// First label that is not reserved and not part of the registrable
    /// domain (the last two labels). IP hosts never carry a tenant.
    fn subdomain_tenant(&self) -> Option<String> {
        let Some(Host::Domain(host)) = self.url.host() else {
            return None;
        };
        let labels: Vec<&str> = host.split('.').collect();
        let candidates = labels.len().saturating_sub(2);

        labels[..candidates]
            .iter()
            .find(|label| !label.is_empty() && !RESERVED_SUBDOMAINS.contains(*label))
            .map(|label| label.to_string())
    }
}

impl FromStr for RequestLocation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Url::parse(s)
            .map(Self::new)
            .map_err(|e| AppError::BadRequest(format!("Invalid location {}: {}", s, e)))
    }
}

impl fmt::Display for RequestLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identification
// ─────────────────────────────────────────────────────────────────────────────

/// Where a tenant identifier came from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TenantSource {
    QueryParam,
    PathSegment,
    Subdomain,
    TokenClaim,
}

impl TenantSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantSource::QueryParam => "query_param",
            TenantSource::PathSegment => "path_segment",
            TenantSource::Subdomain => "subdomain",
            TenantSource::TokenClaim => "token_claim",
        }
    }
}

impl fmt::Display for TenantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantCandidate {
    pub source: TenantSource,
    pub id: String,
}

/// Every identifier the location and claim yield, in priority order.
pub fn candidates(location: &RequestLocation, claim: Option<&str>) -> Vec<TenantCandidate> {
    let found = [
        (TenantSource::QueryParam, location.query_tenant()),
        (TenantSource::PathSegment, location.path_tenant()),
        (TenantSource::Subdomain, location.subdomain_tenant()),
        (
            TenantSource::TokenClaim,
            claim.filter(|c| !c.is_empty()).map(str::to_string),
        ),
    ];

    found
        .into_iter()
        .filter_map(|(source, id)| id.map(|id| TenantCandidate { source, id }))
        .collect()
}

/// The highest-priority identifier, if any source yields one.
pub fn identify(location: &RequestLocation, claim: Option<&str>) -> Option<TenantCandidate> {
    candidates(location, claim).into_iter().next()
}

/// Path for `location_path` re-rooted under `/t/<tenant_id>/`.
///
/// An existing `/t/<id>` or `/tenant/<id>` prefix is dropped first.
pub fn tenant_path(location_path: &str, tenant_id: &str) -> String {
    let segments: Vec<&str> = location_path.split('/').filter(|s| !s.is_empty()).collect();
    let rest = match segments.first() {
        Some(first) if TENANT_PATH_PREFIXES.contains(first) => segments.get(2..).unwrap_or(&[]),
        _ => &segments[..],
    };

    format!("/t/{}/{}", urlencoding::encode(tenant_id), rest.join("/"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// What to do when a found identifier fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupFailurePolicy {
    /// Try the next lower-priority source, then the default tenant.
    #[default]
    FallThrough,
    /// Stop at the first identifier found; use the default tenant if it fails.
    DefaultTenant,
}

impl FromStr for LookupFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallthrough" | "fall-through" | "next" => Ok(Self::FallThrough),
            "default" | "default-tenant" => Ok(Self::DefaultTenant),
            _ => Err(ConfigError::Invalid {
                name: "TENANT_LOOKUP_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

/// Decides the active tenant and publishes it into the [`TenantContext`].
pub struct TenantResolver {
    backend: BackendClient,
    config: Arc<ConfigLoader>,
    context: Arc<TenantContext>,
    auth: Arc<AuthSession>,
    notifier: Notifier,
    policy: LookupFailurePolicy,
}

impl TenantResolver {
    pub fn new(
        backend: BackendClient,
        config: Arc<ConfigLoader>,
        context: Arc<TenantContext>,
        auth: Arc<AuthSession>,
        notifier: Notifier,
        policy: LookupFailurePolicy,
    ) -> Self {
        Self {
            backend,
            config,
            context,
            auth,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> LookupFailurePolicy {
        self.policy
    }

    /// Startup entry point: honours the `tenantMode` flag, then resolves.
    pub async fn initialize(&self, location: &RequestLocation) -> Arc<TenantRecord> {
        let config = self.config.load().await;
        self.context.set_multi_tenant_mode(config.tenant_mode);

        if !config.tenant_mode {
            tracing::info!("Single-tenant mode, using default tenant");
            return self.publish(TenantRecord::default_tenant());
        }

        self.resolve(location).await
    }

    /// Resolve the tenant for `location` and publish it exactly once.
    ///
    /// The token-claim source reads the current session snapshot, which may
    /// not have finished initializing yet.
    pub async fn resolve(&self, location: &RequestLocation) -> Arc<TenantRecord> {
        let claim = self.auth.tenant_claim();
        let found = candidates(location, claim.as_deref());
        let record = self.load_first(&found).await;
        self.publish(record)
    }

    async fn load_first(&self, found: &[TenantCandidate]) -> TenantRecord {
        for candidate in found {
            match self.lookup(&candidate.id).await {
                Ok(record) => {
                    tracing::info!(
                        tenant_id = %record.id,
                        source = %candidate.source,
                        "Tenant resolved"
                    );
                    return record;
                }
                Err(e) => {
                    tracing::warn!(
                        tenant_id = %candidate.id,
                        source = %candidate.source,
                        error = %e,
                        "Failed to load tenant"
                    );
                    if self.policy == LookupFailurePolicy::DefaultTenant {
                        break;
                    }
                }
            }
        }

        tracing::info!("Using default tenant");
        TenantRecord::default_tenant()
    }

    pub async fn lookup(&self, tenant_id: &str) -> Result<TenantRecord> {
        self.backend.get_tenant(tenant_id).await
    }

    fn publish(&self, record: TenantRecord) -> Arc<TenantRecord> {
        let record = Arc::new(record);
        self.context.set_tenant(record.clone());
        record
    }

    /// Switch to `tenant_id`, publish it and re-root `location` under it.
    ///
    /// Failures are surfaced; the context and location are left untouched.
    pub async fn switch_tenant(
        &self,
        tenant_id: &str,
        location: &mut RequestLocation,
    ) -> Result<Arc<TenantRecord>> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(AppError::BadRequest("Tenant id is required".to_string()));
        }

        let record = match self.lookup(tenant_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Failed to switch tenant");
                if let Some(notice) = e.user_notice() {
                    self.notifier.error(notice);
                }
                return Err(e);
            }
        };

        let record = self.publish(record);
        let path = tenant_path(location.path(), tenant_id);
        location.replace_path(&path);
        tracing::info!(tenant_id, location = %location, "Switched tenant");
        Ok(record)
    }
}
