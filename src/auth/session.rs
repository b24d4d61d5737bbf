// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated-user state machine.
//!
//! Handles:
//! - Session restore at startup from a still-valid access token
//! - Login, logout and token refresh
//! - Synchronous role/permission checks over the current user
//!
//! State is published on a watch channel; the last write wins.

use crate::auth::claims;
use crate::auth::token_store::{TokenData, TokenStore};
use crate::error::{AppError, Result};
use crate::models::{LoginRequest, LoginResponse, User};
use crate::services::BackendClient;
use crate::ui::Notifier;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

const LOGIN_FAILED_NOTICE: &str = "Login failed. Please check your credentials.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Startup, before a stored token has been checked
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Published session snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub state: SessionState,
    pub user: Option<Arc<User>>,
}

/// Route guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    /// Not signed in: send the user to the login screen
    RedirectToLogin,
    /// Signed in but lacking the required role or permission
    Unauthorized,
}

pub struct AuthSession {
    backend: BackendClient,
    tokens: Arc<TokenStore>,
    notifier: Notifier,
    snapshot: watch::Sender<AuthSnapshot>,
    initialized: watch::Sender<bool>,
    /// Serializes refresh calls so concurrent 401s share one refresh.
    refresh_lock: Mutex<()>,
}

impl AuthSession {
    pub fn new(backend: BackendClient, tokens: Arc<TokenStore>, notifier: Notifier) -> Self {
        let (snapshot, _) = watch::channel(AuthSnapshot {
            state: SessionState::Initializing,
            user: None,
        });
        let (initialized, _) = watch::channel(false);

        Self {
            backend,
            tokens,
            notifier,
            snapshot,
            initialized,
            refresh_lock: Mutex::new(()),
        }
    }

    // ─── State Publication ───────────────────────────────────────────────────

    fn publish_authenticated(&self, user: User) {
        self.snapshot.send_replace(AuthSnapshot {
            state: SessionState::Authenticated,
            user: Some(Arc::new(user)),
        });
    }

    /// Drop tokens and user state locally, without telling the backend.
    fn clear_local(&self) {
        if let Err(e) = self.tokens.clear_tokens() {
            tracing::warn!(error = %e, "Failed to clear stored tokens");
        }
        self.snapshot.send_replace(AuthSnapshot {
            state: SessionState::Unauthenticated,
            user: None,
        });
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Restore the session from a stored, non-expired access token.
    ///
    /// Any failure signs the user out instead of retrying. Initialization is
    /// marked complete either way.
    pub async fn initialize(&self) {
        if self.tokens.has_valid_token() {
            match self.load_user_profile().await {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "Session restored from stored token");
                    self.publish_authenticated(user);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to restore session, signing out");
                    self.logout().await;
                }
            }
        } else {
            // An unauthenticated session never holds an access token.
            if self.tokens.discard_expired_access_token() {
                tracing::info!("Stored access token expired, dropped");
            }

            // A login that completed while we were starting up wins.
            self.snapshot.send_if_modified(|snapshot| {
                if snapshot.state == SessionState::Initializing {
                    snapshot.state = SessionState::Unauthenticated;
                    true
                } else {
                    false
                }
            });
        }

        self.initialized.send_replace(true);
    }

    async fn load_user_profile(&self) -> Result<User> {
        let authorization = self
            .tokens
            .authorization_header()
            .ok_or(AppError::InvalidToken)?;
        self.backend.me(&authorization).await
    }

    /// Sign in. On failure the error is surfaced and the state is unchanged.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let outcome = async {
            request.validate()?;
            let response = self.backend.login(request).await?;
            let expires_at = expiry_from(response.expires_in)?;
            self.tokens.set_tokens(TokenData {
                access_token: response.access_token.clone(),
                refresh_token: Some(response.refresh_token.clone()),
                expires_at: Some(expires_at),
                token_type: response.token_type.clone(),
            })?;
            Ok::<_, AppError>(response)
        }
        .await;

        match outcome {
            Ok(response) => {
                tracing::info!(user_id = %response.user.id, "Login succeeded");
                self.publish_authenticated(response.user.clone());
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.notifier.error(LOGIN_FAILED_NOTICE);
                Err(e)
            }
        }
    }

    /// Sign out locally, then notify the backend on a best-effort basis.
    pub async fn logout(&self) {
        self.clear_local();
        tracing::info!("Signed out");

        if let Err(e) = self.backend.logout().await {
            tracing::debug!(error = %e, "Logout notification failed (ignored)");
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `None` (and signs out) when there is no refresh token or the
    /// exchange fails.
    pub async fn refresh_token(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Like [`refresh_token`](Self::refresh_token), but skips the exchange
    /// when another task already replaced `stale` with a still-valid token.
    pub async fn refresh_if_stale(&self, stale: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.tokens.access_token() {
            if Some(current.as_str()) != stale && !self.tokens.is_token_expired() {
                return Some(current);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Option<String> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            // Nothing to exchange and no backend session to end.
            tracing::info!("No refresh token stored, signing out");
            self.clear_local();
            return None;
        };

        let response = match self.backend.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, signing out");
                self.logout().await;
                return None;
            }
        };

        let stored = expiry_from(response.expires_in).and_then(|expires_at| {
            self.tokens.set_tokens(TokenData {
                access_token: response.access_token.clone(),
                refresh_token: Some(refresh_token),
                expires_at: Some(expires_at),
                token_type: Some(self.tokens.token_type()),
            })
        });
        if let Err(e) = stored {
            tracing::warn!(error = %e, "Failed to store refreshed token, signing out");
            self.logout().await;
            return None;
        }

        // A fresh token without a known user would break the
        // token-implies-authenticated invariant; load the profile.
        if self.current_user().is_none() {
            match self.load_user_profile().await {
                Ok(user) => self.publish_authenticated(user),
                Err(e) => {
                    tracing::warn!(error = %e, "Profile load after refresh failed, signing out");
                    self.logout().await;
                    return None;
                }
            }
        }

        tracing::info!("Access token refreshed");
        Some(response.access_token)
    }

    // ─── Snapshot Accessors ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn current_user(&self) -> Option<Arc<User>> {
        self.snapshot.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    pub fn subscribe_initialized(&self) -> watch::Receiver<bool> {
        self.initialized.subscribe()
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Tenant the current session belongs to, from the user record or,
    /// failing that, the access token's claims.
    pub fn tenant_claim(&self) -> Option<String> {
        let from_user = self
            .current_user()
            .and_then(|u| u.tenant_id.clone())
            .filter(|t| !t.is_empty());

        from_user.or_else(|| {
            self.tokens
                .access_token()
                .and_then(|token| claims::tenant_claim(&token))
        })
    }

    // ─── Role & Permission Checks ────────────────────────────────────────────

    fn check_user(&self, check: impl FnOnce(&User) -> bool) -> bool {
        self.snapshot.borrow().user.as_deref().is_some_and(check)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.check_user(|u| u.has_role(role))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.check_user(|u| u.has_permission(permission))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.check_user(|u| roles.iter().any(|r| u.has_role(r)))
    }

    /// True for an empty list, even with no user.
    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        roles.is_empty() || self.check_user(|u| roles.iter().all(|r| u.has_role(r)))
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        self.check_user(|u| permissions.iter().any(|p| u.has_permission(p)))
    }

    /// True for an empty list, even with no user.
    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        permissions.is_empty()
            || self.check_user(|u| permissions.iter().all(|p| u.has_permission(p)))
    }

    // ─── Guards ──────────────────────────────────────────────────────────────

    pub fn require_auth(&self) -> GuardOutcome {
        if self.is_authenticated() {
            GuardOutcome::Allow
        } else {
            GuardOutcome::RedirectToLogin
        }
    }

    pub fn require_any_role(&self, roles: &[&str]) -> GuardOutcome {
        self.guard(|| self.has_any_role(roles))
    }

    pub fn require_any_permission(&self, permissions: &[&str]) -> GuardOutcome {
        self.guard(|| self.has_any_permission(permissions))
    }

    fn guard(&self, allowed: impl FnOnce() -> bool) -> GuardOutcome {
        if self.current_user().is_none() {
            GuardOutcome::RedirectToLogin
        } else if allowed() {
            GuardOutcome::Allow
        } else {
            GuardOutcome::Unauthorized
        }
    }
}

/// Absolute expiry for a token valid for `expires_in` seconds from now.
fn expiry_from(expires_in: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Transport(format!("expiresIn out of range: {}", expires_in)))
}
