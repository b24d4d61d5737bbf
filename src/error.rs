// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing notices.

use crate::config::ConfigError;

/// Application error type shared by every session component.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    pub const SESSION_EXPIRED_NOTICE: &'static str = "Session expired. Please log in again.";

    /// HTTP status associated with this error, if it came from (or maps to) one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Unauthorized | AppError::SessionExpired => Some(401),
            AppError::NotFound(_) => Some(404),
            AppError::BadRequest(_) => Some(400),
            AppError::Http { status, .. } => Some(*status),
            AppError::InvalidToken
            | AppError::Transport(_)
            | AppError::Storage(_)
            | AppError::Config(_) => None,
        }
    }

    /// Message shown to the user when this error reaches an action they triggered.
    ///
    /// Errors without an HTTP status (transport failures, local storage) are
    /// silent here; the caller decides how to present them.
    pub fn user_notice(&self) -> Option<&'static str> {
        let notice = match self.status()? {
            400 => "Bad request. Please check your input.",
            401 => Self::SESSION_EXPIRED_NOTICE,
            403 => "Access denied. You don't have permission to perform this action.",
            404 => "Resource not found.",
            409 => "Conflict. The resource already exists or has been modified.",
            422 => "Validation failed. Please check your input.",
            429 => "Too many requests. Please try again later.",
            500 => "Server error. Please try again later.",
            502..=504 => "Service temporarily unavailable. Please try again later.",
            s if s >= 400 => "An unexpected error occurred. Please try again.",
            _ => return None,
        };
        Some(notice)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AppError>;
