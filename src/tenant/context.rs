//! Process-wide holder of the resolved tenant.
//!
//! The resolver is the only writer; everything else observes.

use crate::models::TenantRecord;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

pub struct TenantContext {
    tenant: watch::Sender<Option<Arc<TenantRecord>>>,
    multi_tenant: watch::Sender<bool>,
}

impl Default for TenantContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantContext {
    pub fn new() -> Self {
        let (tenant, _) = watch::channel(None);
        let (multi_tenant, _) = watch::channel(false);
        Self {
            tenant,
            multi_tenant,
        }
    }

    pub fn set_tenant(&self, tenant: Arc<TenantRecord>) {
        tracing::debug!(tenant_id = %tenant.id, "Publishing tenant");
        self.tenant.send_replace(Some(tenant));
    }

    pub fn clear_tenant(&self) {
        self.tenant.send_replace(None);
    }

    pub fn tenant(&self) -> Option<Arc<TenantRecord>> {
        self.tenant.borrow().clone()
    }

    pub fn tenant_id(&self) -> Option<String> {
        self.tenant.borrow().as_ref().map(|t| t.id.clone())
    }

    /// Feature flag of the current tenant; false when either is absent.
    pub fn feature(&self, name: &str) -> bool {
        self.tenant
            .borrow()
            .as_ref()
            .is_some_and(|t| t.feature(name))
    }

    pub fn setting(&self, name: &str) -> Option<Value> {
        self.tenant
            .borrow()
            .as_ref()
            .and_then(|t| t.setting(name).cloned())
    }

    pub fn set_multi_tenant_mode(&self, enabled: bool) {
        self.multi_tenant.send_replace(enabled);
    }

    pub fn is_multi_tenant(&self) -> bool {
        *self.multi_tenant.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<TenantRecord>>> {
        self.tenant.subscribe()
    }

    pub fn subscribe_multi_tenant(&self) -> watch::Receiver<bool> {
        self.multi_tenant.subscribe()
    }
}
