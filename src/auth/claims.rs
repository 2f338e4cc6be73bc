// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified token claims.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::provider::ProviderError;
use super::AuthError;

/// Subject identifier claim (the provider's user id).
pub const SUBJECT_CLAIM: &str = "sub";

/// List-valued claim carrying the subject's granted permission strings.
///
/// Kept short to keep tokens small.
pub const PERMISSIONS_CLAIM: &str = "perms";

/// Claims decoded from a credential the identity provider accepted.
///
/// Only identity providers can build this type, so holding one means the
/// credential was verified. Claim values are kept as decoded; typed views
/// (`permissions`, [`super::Identity::from_claims`]) validate on access.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedClaims {
    subject: String,
    claims: Map<String, Value>,
}

impl VerifiedClaims {
    /// Wrap a provider-verified payload. The subject claim is mandatory.
    pub(crate) fn from_verified(claims: Map<String, Value>) -> Result<Self, ProviderError> {
        let subject = match claims.get(SUBJECT_CLAIM) {
            Some(Value::String(sub)) if !sub.is_empty() => sub.clone(),
            _ => return Err(ProviderError::MissingSubject),
        };

        Ok(Self { subject, claims })
    }

    /// Subject identifier (`sub`).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Raw claim value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// All claims as decoded by the provider.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Granted permission strings from the `perms` claim.
    ///
    /// An absent claim is an empty grant; anything other than a list of
    /// strings is rejected.
    pub fn permissions(&self) -> Result<Vec<String>, AuthError> {
        match self.claims.get(PERMISSIONS_CLAIM) {
            None => Ok(Vec::new()),
            Some(value) => Vec::<String>::deserialize(value).map_err(|_| {
                AuthError::ClaimsTypeInvalid {
                    claim: PERMISSIONS_CLAIM,
                }
            }),
        }
    }
}

#[cfg(test)]
pub(crate) fn claims_from_json(value: Value) -> VerifiedClaims {
    match value {
        Value::Object(map) => VerifiedClaims::from_verified(map).expect("test claims need a subject"),
        other => panic!("claims must be a JSON object, got {other}"),
    }
}
