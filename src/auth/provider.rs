// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider seam and the token verifier built on it.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthError, Credential, VerifiedClaims};

/// Why an identity provider refused a credential.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Token could not be parsed as a JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Signature, expiry, issuer, audience or algorithm check failed.
    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),

    /// No key in the key set matches the token.
    #[error("no signing key matches kid {0:?}")]
    NoMatchingKey(Option<String>),

    /// Key set could not be fetched.
    #[error("failed to fetch key set: {0}")]
    KeyFetch(String),

    /// A fetched key could not be turned into a verification key.
    #[error("unusable key: {0}")]
    InvalidKey(String),

    /// The verified payload carries no subject.
    #[error("verified token has no subject")]
    MissingSubject,

    /// Signing a token failed (local provider only).
    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// External authority that verifies credentials and returns their claims.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name for logs and health output.
    fn name(&self) -> &'static str;

    /// Verify the credential and decode its claims.
    async fn verify(&self, credential: &str) -> Result<VerifiedClaims, ProviderError>;

    /// Whether the provider can currently verify tokens.
    async fn check_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Verifies credentials through the configured identity provider.
///
/// Every call reaches the provider; results are never cached.
#[derive(Clone)]
pub struct TokenVerifier {
    provider: Arc<dyn IdentityProvider>,
}

impl TokenVerifier {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Verify one credential. Provider errors are wrapped, not reinterpreted.
    pub async fn verify(&self, credential: &Credential) -> Result<VerifiedClaims, AuthError> {
        self.provider
            .verify(credential.as_str())
            .await
            .map_err(AuthError::VerificationFailed)
    }
}
