// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Production identity provider: ID tokens verified against a published JWKS.
//!
//! Defaults follow a Firebase-style project, where tokens are issued by
//! `https://securetoken.google.com/<project_id>` for audience `<project_id>`
//! and signed with keys published at [`DEFAULT_JWKS_URL`].

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::{Map, Value};

use super::jwks::JwksManager;
use super::provider::{IdentityProvider, ProviderError};
use super::VerifiedClaims;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Public key set for securetoken-issued ID tokens.
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Timeout for each key set fetch.
const JWKS_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Where keys come from and what the tokens must say about themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwksProviderConfig {
    pub jwks_url: String,
    pub issuer: String,
    pub audience: String,
}

impl JwksProviderConfig {
    /// Defaults for a project id.
    pub fn for_project(project_id: &str) -> Self {
        Self {
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            issuer: format!("https://securetoken.google.com/{project_id}"),
            audience: project_id.to_string(),
        }
    }
}

/// Verifies signed ID tokens against the provider's key set.
pub struct JwksIdentityProvider {
    jwks: JwksManager,
    issuer: String,
    audience: String,
}

impl JwksIdentityProvider {
    pub fn new(config: JwksProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            jwks: JwksManager::new(config.jwks_url, JWKS_HTTP_TIMEOUT)?,
            issuer: config.issuer,
            audience: config.audience,
        })
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    fn validation(&self, algorithm: jsonwebtoken::Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation
    }
}

#[async_trait]
impl IdentityProvider for JwksIdentityProvider {
    fn name(&self) -> &'static str {
        "jwks"
    }

    async fn verify(&self, credential: &str) -> Result<VerifiedClaims, ProviderError> {
        let header =
            decode_header(credential).map_err(|e| ProviderError::MalformedToken(e.to_string()))?;

        let (decoding_key, algorithm) = self.jwks.decoding_key(header.kid.as_deref()).await?;

        let token_data =
            decode::<Map<String, Value>>(credential, &decoding_key, &self.validation(algorithm))?;

        VerifiedClaims::from_verified(token_data.claims)
    }

    async fn check_ready(&self) -> Result<(), ProviderError> {
        if self.jwks.is_cached().await {
            return Ok(());
        }
        self.jwks.refresh().await.map(|_| ())
    }
}
