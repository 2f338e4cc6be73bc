// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Development identity provider.
//!
//! Issues and verifies HS256 tokens signed with a shared secret, so the API
//! can be exercised without a real identity project. At startup the server
//! logs a reader token (no permissions) and a writer token.
//!
//! WARNING: anyone holding the secret can mint tokens. Development only.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::{Map, Value};

use super::provider::{IdentityProvider, ProviderError};
use super::VerifiedClaims;

/// Issuer and audience stamped on locally issued tokens.
pub const LOCAL_ISSUER: &str = "users-api-local";

/// Minimum secret length accepted for HS256.
pub const MIN_SECRET_LEN: usize = 32;

/// Profile of the subject a token is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub subject_id: String,
    pub email: String,
    pub role: String,
    pub display_name: String,
}

impl TokenSubject {
    /// Placeholder developer profile used for the startup tokens.
    pub fn developer(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: "developer@localhost".to_string(),
            role: "developer".to_string(),
            display_name: "Local Developer".to_string(),
        }
    }
}

#[derive(Serialize)]
struct IssuedClaims<'a> {
    sub: &'a str,
    iss: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    email: &'a str,
    role: &'a str,
    name: &'a str,
    perms: &'a [&'a str],
}

/// HS256 issuer and verifier.
pub struct LocalIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl LocalIdentityProvider {
    pub fn new(secret: &[u8], token_ttl: Duration) -> Result<Self, ProviderError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(ProviderError::InvalidKey(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_ttl,
        })
    }

    /// Issue a token granting `permissions`.
    pub fn issue_token(
        &self,
        subject: &TokenSubject,
        permissions: &[&str],
    ) -> Result<String, ProviderError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = IssuedClaims {
            sub: &subject.subject_id,
            iss: LOCAL_ISSUER,
            aud: LOCAL_ISSUER,
            iat: now,
            exp: now.saturating_add(ttl),
            email: &subject.email,
            role: &subject.role,
            name: &subject.display_name,
            perms: permissions,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ProviderError::Issue(e.to_string()))
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[LOCAL_ISSUER]);
        validation.set_audience(&[LOCAL_ISSUER]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn verify(&self, credential: &str) -> Result<VerifiedClaims, ProviderError> {
        let token_data =
            decode::<Map<String, Value>>(credential, &self.decoding, &Self::validation())?;
        VerifiedClaims::from_verified(token_data.claims)
    }
}
