// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tenant resolution against the fake backend.
//!
//! These tests verify that:
//! 1. The highest-priority source that loads wins
//! 2. Failed lookups follow the configured policy
//! 3. Switching tenants publishes the new tenant and rewrites the location

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use storefront_session::error::AppError;
use storefront_session::models::LoginRequest;
use storefront_session::tenant::{LookupFailurePolicy, RequestLocation};

mod common;
use common::{test_app, test_app_with, PASSWORD};

fn loc(s: &str) -> RequestLocation {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_query_param_beats_subdomain() {
    let app = test_app().await;

    let tenant = app
        .state
        .resolver
        .resolve(&loc("https://acme-other.platform.com/?tenant=acme"))
        .await;

    assert_eq!(tenant.id, "acme");
    assert_eq!(app.state.tenant.tenant_id().as_deref(), Some("acme"));
    assert_eq!(app.backend.tenant_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_each_source_resolves() {
    let app = test_app().await;

    let cases = [
        ("http://localhost:4200/t/globex/products", "globex"),
        ("http://localhost:4200/tenant/initech", "initech"),
        ("https://initech.platform.com/catalog", "initech"),
        ("https://www.acme.platform.com/", "acme"),
    ];
    for (location, expected) in cases {
        let tenant = app.state.resolver.resolve(&loc(location)).await;
        assert_eq!(tenant.id, expected, "location {}", location);
    }
}

#[tokio::test]
async fn test_path_beats_subdomain_and_claim() {
    let app = test_app().await;
    app.backend.set_user_tenant(Some("initech"));
    app.state
        .auth
        .login(&LoginRequest::new("ada@acme.test", PASSWORD))
        .await
        .unwrap();

    let tenant = app
        .state
        .resolver
        .resolve(&loc("https://acme.platform.com/t/globex/"))
        .await;

    assert_eq!(tenant.id, "globex");
}

#[tokio::test]
async fn test_user_tenant_claim() {
    let app = test_app().await;
    app.backend.set_user_tenant(Some("initech"));
    app.state
        .auth
        .login(&LoginRequest::new("ada@acme.test", PASSWORD))
        .await
        .unwrap();

    let tenant = app
        .state
        .resolver
        .resolve(&loc("http://localhost:4200/dashboard"))
        .await;

    assert_eq!(tenant.id, "initech");
}

#[tokio::test]
async fn test_access_token_tenant_claim() {
    let app = test_app().await;
    let token = encode(
        &Header::default(),
        &json!({ "sub": "u-9", "tenantId": "globex", "exp": 4_102_444_800u64 }),
        &EncodingKey::from_secret(b"not-the-server-key"),
    )
    .unwrap();
    app.state.tokens.set_access_token_from_secure_source(token);

    let tenant = app
        .state
        .resolver
        .resolve(&loc("http://localhost:4200/"))
        .await;

    assert_eq!(tenant.id, "globex");
}

#[tokio::test]
async fn test_no_source_uses_default_without_lookup() {
    let app = test_app().await;

    let tenant = app
        .state
        .resolver
        .resolve(&loc("https://platform.com/products"))
        .await;

    assert!(tenant.is_default());
    assert_eq!(app.state.tenant.tenant_id().as_deref(), Some("default"));
    assert_eq!(app.backend.tenant_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_lookup_falls_through() {
    let app = test_app_with(LookupFailurePolicy::FallThrough, true).await;

    let tenant = app
        .state
        .resolver
        .resolve(&loc("https://globex.platform.com/t/broken/?tenant=unknown"))
        .await;

    assert_eq!(tenant.id, "globex");
    assert_eq!(app.backend.tenant_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_lookup_uses_default_tenant() {
    let app = test_app_with(LookupFailurePolicy::DefaultTenant, true).await;

    let tenant = app
        .state
        .resolver
        .resolve(&loc("https://globex.platform.com/?tenant=unknown"))
        .await;

    assert!(tenant.is_default());
    assert_eq!(app.backend.tenant_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_single_tenant_mode_ignores_sources() {
    let app = test_app_with(LookupFailurePolicy::default(), false).await;

    let tenant = app
        .state
        .resolver
        .initialize(&loc("https://platform.com/?tenant=acme"))
        .await;

    assert!(tenant.is_default());
    assert!(!app.state.tenant.is_multi_tenant());
    assert_eq!(app.backend.tenant_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_initialize_multi_tenant() {
    let app = test_app().await;

    let tenant = app
        .state
        .resolver
        .initialize(&loc("https://platform.com/?tenant=acme"))
        .await;

    assert_eq!(tenant.id, "acme");
    assert!(app.state.tenant.is_multi_tenant());
    assert!(app.state.tenant.feature("wishlist"));
    assert_eq!(app.state.tenant.setting("currency"), Some(json!("USD")));
}

#[tokio::test]
async fn test_switch_tenant_rewrites_location() {
    let app = test_app().await;
    let mut location = loc("https://platform.com/t/acme/orders?page=2");
    app.state.resolver.resolve(&location).await;
    let mut updates = app.state.tenant.subscribe();

    let tenant = app
        .state
        .resolver
        .switch_tenant("globex", &mut location)
        .await
        .unwrap();

    assert_eq!(tenant.id, "globex");
    assert!(updates.has_changed().unwrap());
    assert_eq!(
        updates.borrow_and_update().as_ref().map(|t| t.id.clone()),
        Some("globex".to_string())
    );
    assert_eq!(location.as_str(), "https://platform.com/t/globex/orders?page=2");
}

#[tokio::test]
async fn test_switch_to_unknown_tenant_fails() {
    let app = test_app().await;
    let mut location = loc("https://platform.com/t/acme/orders");
    app.state.resolver.resolve(&location).await;
    let mut notices = app.state.notifier.subscribe();

    let result = app
        .state
        .resolver
        .switch_tenant("umbrella", &mut location)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(app.state.tenant.tenant_id().as_deref(), Some("acme"));
    assert_eq!(location.path(), "/t/acme/orders");
    assert_eq!(notices.try_recv().unwrap().message, "Resource not found.");
}

#[tokio::test]
async fn test_switch_requires_tenant_id() {
    let app = test_app().await;
    let mut location = loc("https://platform.com/");

    let result = app.state.resolver.switch_tenant("  ", &mut location).await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(app.backend.tenant_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bootstrap() {
    let app = test_app().await;

    let tenant = app
        .state
        .bootstrap(&loc("https://acme.platform.com/"))
        .await;

    assert_eq!(tenant.id, "acme");
    assert!(app.state.auth.is_initialized());
    assert!(!app.state.auth.is_authenticated());
    assert!(app.state.is_sweeper_running());
}

#[tokio::test]
async fn test_repeated_bootstrap_starts_one_sweeper() {
    let app = test_app().await;
    assert!(!app.state.is_sweeper_running());

    app.state.bootstrap(&loc("https://acme.platform.com/")).await;
    app.state.bootstrap(&loc("https://globex.platform.com/")).await;

    assert!(app.state.is_sweeper_running());
    // Each sweeper holds one weak reference to the cache.
    assert_eq!(Arc::weak_count(&app.state.cache), 1);
}
