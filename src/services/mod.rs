// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend communication layer.

pub mod api;
pub mod backend;

pub use api::{ApiClient, RequestOptions};
pub use backend::BackendClient;
