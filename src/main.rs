// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront session diagnostic
//!
//! Bootstraps a session against `APP_URL` and logs the resolved tenant, the
//! enabled features and the authentication state.

use storefront_session::{config::Settings, tenant::RequestLocation, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load settings from environment
    let settings = Settings::from_env()?;
    let location: RequestLocation = settings.app_url.parse()?;
    tracing::info!(location = %location, policy = ?settings.lookup_policy, "Starting session diagnostic");

    let state = AppState::new(settings)?;
    let tenant = state.bootstrap(&location).await;

    let config = state.config.load().await;
    let mut features: Vec<&str> = config
        .features
        .iter()
        .filter(|(_, enabled)| **enabled)
        .map(|(name, _)| name.as_str())
        .collect();
    features.sort_unstable();

    tracing::info!(
        tenant_id = %tenant.id,
        tenant_name = %tenant.name,
        multi_tenant = state.tenant.is_multi_tenant(),
        features = ?features,
        "Tenant resolved"
    );
    tracing::info!(
        state = ?state.auth.state(),
        user_id = ?state.auth.current_user().map(|u| u.id.clone()),
        "Session initialized"
    );

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront_session=debug,info")),
        )
        .with(format)
        .init();
}
