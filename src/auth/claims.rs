// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reading claims from access tokens.
//!
//! The client never holds the signing key, so the signature is not checked
//! here; the claims are only used as hints (e.g. which tenant to load) and
//! the backend re-validates the token on every call.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Access token claims the client cares about.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AccessClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: Option<u64>,
    /// Tenant the token was issued for
    #[serde(default, alias = "tenantId")]
    pub tenant_id: Option<String>,
}

/// Decode the payload of `token` without verifying its signature.
pub fn peek_claims(token: &str) -> Option<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "Access token is not a readable JWT");
            None
        }
    }
}

/// Tenant identifier carried in `token`, if any.
pub fn tenant_claim(token: &str) -> Option<String> {
    peek_claims(token)?.tenant_id.filter(|t| !t.is_empty())
}
