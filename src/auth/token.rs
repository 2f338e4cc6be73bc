// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential extraction.

use std::fmt;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Raw bearer token taken from the `Authorization` header.
///
/// Never empty. `Debug` is redacted so the token cannot end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Pull the bearer credential out of the request headers.
///
/// The scheme is case-sensitive and must be followed by exactly one space.
pub fn bearer_credential(headers: &HeaderMap) -> Result<Credential, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    if value.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedCredential)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthError::MalformedCredential);
    }

    Ok(Credential(token.to_string()))
}
