// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reference-counted loading indicator.
//!
//! Any number of concurrent operations can request the indicator; it stays
//! visible until the last of them releases it. Callers should prefer
//! [`LoadingIndicator::acquire`], whose guard releases on drop, over manual
//! `show`/`hide` pairs.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

pub const DEFAULT_MESSAGE: &str = "Loading...";

/// Published indicator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub message: String,
    pub show_spinner: bool,
}

impl LoadingState {
    fn hidden() -> Self {
        Self {
            is_loading: false,
            message: DEFAULT_MESSAGE.to_string(),
            show_spinner: true,
        }
    }
}

pub struct LoadingIndicator {
    count: Mutex<usize>,
    state: watch::Sender<LoadingState>,
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingIndicator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LoadingState::hidden());
        Self {
            count: Mutex::new(0),
            state,
        }
    }

    fn count_lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the count; the indicator appears on the 0→1 transition only.
    pub fn show(&self, message: Option<&str>) {
        self.show_with(message, true);
    }

    pub fn show_with(&self, message: Option<&str>, show_spinner: bool) {
        let mut count = self.count_lock();
        *count += 1;
        if *count == 1 {
            self.state.send_replace(LoadingState {
                is_loading: true,
                message: message.unwrap_or(DEFAULT_MESSAGE).to_string(),
                show_spinner,
            });
        }
    }

    /// Decrement the count (floored at zero); the indicator hides on 1→0.
    pub fn hide(&self) {
        let mut count = self.count_lock();
        let was_visible = *count > 0;
        *count = count.saturating_sub(1);
        if was_visible && *count == 0 {
            self.state.send_replace(LoadingState::hidden());
        }
    }

    /// Show the indicator until the returned guard is dropped.
    pub fn acquire(&self, message: Option<&str>) -> LoadingGuard<'_> {
        self.show(message);
        LoadingGuard { indicator: self }
    }

    /// Run `operation` with the indicator held, released however it settles.
    pub async fn with_loading<F: Future>(&self, message: Option<&str>, operation: F) -> F::Output {
        let _guard = self.acquire(message);
        operation.await
    }

    /// Force the indicator hidden and forget all outstanding requests.
    pub fn reset(&self) {
        let mut count = self.count_lock();
        *count = 0;
        self.state.send_replace(LoadingState::hidden());
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn count(&self) -> usize {
        *self.count_lock()
    }

    pub fn state(&self) -> LoadingState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
        self.state.subscribe()
    }
}

/// Releases one loading request when dropped.
#[must_use = "the indicator is released as soon as the guard is dropped"]
pub struct LoadingGuard<'a> {
    indicator: &'a LoadingIndicator,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.indicator.hide();
    }
}
