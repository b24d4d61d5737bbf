// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models exchanged with the backend.

pub mod page;
pub mod tenant;
pub mod user;

pub use page::PaginatedResponse;
pub use tenant::{Branding, TenantConfig, TenantRecord};
pub use user::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, User};
