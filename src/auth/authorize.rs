// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim-based authorization.

use std::collections::HashSet;

use super::{AuthError, VerifiedClaims};

/// Claims an operation requires, as declared in the API contract.
///
/// Sorted and de-duplicated so that logs and comparisons are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredClaims(Vec<String>);

impl RequiredClaims {
    pub fn new<I, S>(claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut claims: Vec<String> = claims.into_iter().map(Into::into).collect();
        claims.sort();
        claims.dedup();
        Self(claims)
    }

    /// No claim required.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Check that every required claim is granted by the token.
///
/// All required claims must be present; order does not matter.
pub fn authorize(claims: &VerifiedClaims, required: &RequiredClaims) -> Result<(), AuthError> {
    let granted: HashSet<String> = claims.permissions()?.into_iter().collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|claim| !granted.contains(*claim))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::ClaimsInsufficient { missing })
    }
}
