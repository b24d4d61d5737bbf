// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tenant resolution and the published tenant context.

pub mod context;
pub mod resolver;

pub use context::TenantContext;
pub use resolver::{
    LookupFailurePolicy, RequestLocation, TenantCandidate, TenantResolver, TenantSource,
};
