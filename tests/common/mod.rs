// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fake backend and test state builders.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storefront_session::config::{AppConfig, ConfigLoader, Settings};
use storefront_session::storage::MemoryStorage;
use storefront_session::tenant::LookupFailurePolicy;
use storefront_session::AppState;

pub const PASSWORD: &str = "correct-horse";
pub const LOGIN_ACCESS_TOKEN: &str = "access-1";
pub const LOGIN_REFRESH_TOKEN: &str = "refresh-1";

/// Call counters and switches for the fake backend.
#[derive(Default)]
pub struct FakeBackend {
    pub tenant_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub product_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    /// `expiresIn` returned by login and refresh instead of 3600
    pub expires_in: Mutex<Option<i64>>,
    /// Tenant id placed on the user returned by login and `/auth/me`
    pub user_tenant: Mutex<Option<String>>,
    /// Access token currently accepted on protected routes
    pub valid_token: Mutex<Option<String>>,
    pub last_authorization: Mutex<Option<String>>,
    pub last_tenant_header: Mutex<Option<String>>,
    pub last_request_id: Mutex<Option<String>>,
}

impl FakeBackend {
    /// Make the server reject the current access token.
    #[allow(dead_code)]
    pub fn revoke_access_token(&self) {
        *self.valid_token.lock().unwrap() = Some("revoked".to_string());
    }

    #[allow(dead_code)]
    pub fn set_user_tenant(&self, tenant: Option<&str>) {
        *self.user_tenant.lock().unwrap() = tenant.map(str::to_string);
    }

    fn expires_in(&self) -> i64 {
        self.expires_in.lock().unwrap().unwrap_or(3600)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let sent = header_value(headers, header::AUTHORIZATION.as_str());
        *self.last_authorization.lock().unwrap() = sent.clone();
        *self.last_tenant_header.lock().unwrap() = header_value(headers, "x-tenant-id");
        *self.last_request_id.lock().unwrap() = header_value(headers, "x-request-id");

        let valid = self.valid_token.lock().unwrap().clone();
        match (sent, valid) {
            (Some(sent), Some(valid)) => sent == format!("Bearer {}", valid),
            _ => false,
        }
    }

    fn user(&self) -> Value {
        let tenant = self.user_tenant.lock().unwrap().clone();
        json!({
            "id": "u-1",
            "email": "ada@acme.test",
            "name": "Ada Lovelace",
            "roles": ["admin"],
            "permissions": ["orders:read"],
            "tenantId": tenant,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn tenant_json(id: &str) -> Option<Value> {
    let name = match id {
        "acme" => "Acme Corp",
        "globex" => "Globex",
        "initech" => "Initech",
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": name,
        "domain": format!("{}.platform.com", id),
        "theme": { "primary": "#111111", "secondary": "#222222" },
        "config": {
            "features": { "orders": true, "wishlist": id == "acme" },
            "settings": { "currency": "USD" }
        }
    }))
}

async fn get_tenant(State(fake): State<Arc<FakeBackend>>, Path(id): Path<String>) -> Response {
    fake.tenant_calls.fetch_add(1, Ordering::SeqCst);
    if id == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match tenant_json(&id) {
        Some(tenant) => Json(tenant).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn login(State(fake): State<Arc<FakeBackend>>, Json(body): Json<Value>) -> Response {
    fake.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }

    *fake.valid_token.lock().unwrap() = Some(LOGIN_ACCESS_TOKEN.to_string());
    Json(json!({
        "accessToken": LOGIN_ACCESS_TOKEN,
        "refreshToken": LOGIN_REFRESH_TOKEN,
        "expiresIn": fake.expires_in(),
        "user": fake.user(),
    }))
    .into_response()
}

async fn refresh(State(fake): State<Arc<FakeBackend>>, Json(body): Json<Value>) -> Response {
    let n = fake.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if fake.fail_refresh.load(Ordering::SeqCst) || body["refreshToken"] != LOGIN_REFRESH_TOKEN {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let token = format!("access-{}", n + 1);
    *fake.valid_token.lock().unwrap() = Some(token.clone());
    Json(json!({ "accessToken": token, "expiresIn": fake.expires_in() })).into_response()
}

async fn logout(State(fake): State<Arc<FakeBackend>>) -> StatusCode {
    fake.logout_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn me(State(fake): State<Arc<FakeBackend>>, headers: HeaderMap) -> Response {
    fake.me_calls.fetch_add(1, Ordering::SeqCst);
    if !fake.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(fake.user()).into_response()
}

async fn orders(State(fake): State<Arc<FakeBackend>>, headers: HeaderMap) -> Response {
    if !fake.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([{ "id": "o-1", "total": 42 }])).into_response()
}

async fn create_order(
    State(fake): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !fake.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (StatusCode::CREATED, Json(json!({ "id": "o-2", "order": body }))).into_response()
}

async fn update_order(
    State(fake): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !fake.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "id": id, "order": body })).into_response()
}

async fn delete_order(State(fake): State<Arc<FakeBackend>>, headers: HeaderMap) -> StatusCode {
    if !fake.authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    StatusCode::NO_CONTENT
}

async fn products(State(fake): State<Arc<FakeBackend>>, headers: HeaderMap) -> Json<Value> {
    fake.authorized(&headers);
    let n = fake.product_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "page": n, "items": ["widget", "gadget"] }))
}

const CATALOG: [&str; 5] = ["widget", "gadget", "gizmo", "doohickey", "sprocket"];

/// Pages over [`CATALOG`] using the `page` and `pageSize` query parameters.
async fn products_paged(
    State(fake): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !fake.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let number = |name: &str| params.get(name).and_then(|v| v.parse::<usize>().ok());
    let (Some(page), Some(page_size)) = (number("page"), number("pageSize")) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if page == 0 || page_size == 0 {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let data: Vec<&str> = CATALOG
        .iter()
        .copied()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    Json(json!({
        "data": data,
        "total": CATALOG.len(),
        "page": page,
        "pageSize": page_size,
        "totalPages": CATALOG.len().div_ceil(page_size),
        "sort": params.get("sort"),
    }))
    .into_response()
}

async fn public_catalog(State(fake): State<Arc<FakeBackend>>, headers: HeaderMap) -> Json<Value> {
    fake.authorized(&headers);
    Json(json!({ "items": [] }))
}

async fn forbidden() -> StatusCode {
    StatusCode::FORBIDDEN
}

/// Start the fake backend on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_backend() -> (SocketAddr, Arc<FakeBackend>) {
    let fake = Arc::new(FakeBackend::default());

    let app = Router::new()
        .route("/api/tenants/{id}", get(get_tenant))
        .route("/api/auth/me", get(me))
        .route("/api/orders", get(orders).post(create_order))
        .route("/api/orders/{id}", delete(delete_order).patch(update_order))
        .route("/api/products", get(products))
        .route("/api/products/paged", get(products_paged))
        .route("/api/public/catalog", get(public_catalog))
        .route("/api/admin/reports", get(forbidden))
        .route("/identity/auth/login", post(login))
        .route("/identity/auth/refresh", post(refresh))
        .route("/identity/auth/logout", post(logout))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake backend");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, fake)
}

pub struct TestApp {
    pub state: AppState,
    pub backend: Arc<FakeBackend>,
    #[allow(dead_code)]
    pub storage: Arc<MemoryStorage>,
}

/// Multi-tenant app against a fresh fake backend.
#[allow(dead_code)]
pub async fn test_app() -> TestApp {
    test_app_with(LookupFailurePolicy::default(), true).await
}

#[allow(dead_code)]
pub async fn test_app_with(policy: LookupFailurePolicy, tenant_mode: bool) -> TestApp {
    let (addr, backend) = spawn_backend().await;
    let config = AppConfig {
        api_base_url: format!("http://{}/api", addr),
        identity_server_url: format!("http://{}/identity", addr),
        tenant_mode,
        ..AppConfig::default()
    };
    let settings = Settings {
        lookup_policy: policy,
        ..Settings::default()
    };
    let storage = Arc::new(MemoryStorage::new());

    let state = AppState::with_parts(settings, ConfigLoader::preloaded(config), storage.clone());
    TestApp {
        state,
        backend,
        storage,
    }
}
