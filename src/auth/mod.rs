// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication: token storage, token claims and the session state machine.

pub mod claims;
pub mod session;
pub mod token_store;

pub use session::{AuthSession, AuthSnapshot, GuardOutcome, SessionState};
pub use token_store::{TokenData, TokenStore};
