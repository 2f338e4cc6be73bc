// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application identity derived from verified claims.

use serde_json::Value;

use super::{AuthError, VerifiedClaims};

pub const EMAIL_CLAIM: &str = "email";
pub const ROLE_CLAIM: &str = "role";
pub const DISPLAY_NAME_CLAIM: &str = "name";

/// The authenticated caller.
///
/// Created once per request by the authentication middleware and dropped
/// with the request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Identity provider subject (`sub`).
    pub subject_id: String,
    pub email: String,
    pub role: String,
    /// Human-readable name (`name` claim).
    pub display_name: String,
}

impl Identity {
    /// Map verified claims onto an identity.
    ///
    /// `email`, `role` and `name` must be present as strings on every
    /// verified token.
    pub fn from_claims(claims: &VerifiedClaims) -> Result<Self, AuthError> {
        Ok(Self {
            subject_id: claims.subject().to_string(),
            email: string_claim(claims, EMAIL_CLAIM)?,
            role: string_claim(claims, ROLE_CLAIM)?,
            display_name: string_claim(claims, DISPLAY_NAME_CLAIM)?,
        })
    }
}

fn string_claim(claims: &VerifiedClaims, claim: &'static str) -> Result<String, AuthError> {
    match claims.get(claim) {
        Some(Value::String(value)) => Ok(value.clone()),
        _ => Err(AuthError::IdentityClaimMissing { claim }),
    }
}
