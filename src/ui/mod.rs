// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared UI state: the blocking loading indicator and user notices.

pub mod loading;
pub mod notice;

pub use loading::{LoadingGuard, LoadingIndicator, LoadingState};
pub use notice::{Notice, NoticeLevel, Notifier};
