// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant terminates the request. Clients only ever see one of three
//! generic messages; the variant, its error code and its source are logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::provider::ProviderError;

/// Message returned for every 401.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Please provide valid credentials";

/// Message returned for every 403.
pub const INSUFFICIENT_PERMISSIONS_MESSAGE: &str = "Insufficient permissions for this operation";

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Authentication and authorization failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header, or an empty one.
    #[error("authorization header is missing")]
    MissingCredential,

    /// Header present but not `Bearer <token>`.
    #[error("authorization header is malformed (expected 'Bearer <token>')")]
    MalformedCredential,

    /// The identity provider refused the credential.
    #[error("credential verification failed: {0}")]
    VerificationFailed(#[source] ProviderError),

    /// The permissions claim is present but is not a list of strings.
    #[error("claim '{claim}' has an unexpected type")]
    ClaimsTypeInvalid { claim: &'static str },

    /// One or more required claims are not granted.
    #[error("missing required claims: {}", missing.join(", "))]
    ClaimsInsufficient { missing: Vec<String> },

    /// A verified token lacks a claim the identity needs.
    #[error("verified token has no string claim '{claim}'")]
    IdentityClaimMissing { claim: &'static str },

    /// The matched route has no entry in the API contract.
    #[error("operation {method} {path} is not declared in the API contract")]
    UndeclaredOperation { method: String, path: String },

    /// A handler asked for the identity on a route the middleware does not guard.
    #[error("no authenticated identity attached to the request")]
    NotAuthenticated,
}

#[derive(Serialize)]
struct AuthErrorBody {
    message: &'static str,
}

impl AuthError {
    /// Get the error code for this error (logged, never returned).
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedCredential => "malformed_credential",
            AuthError::VerificationFailed(_) => "verification_failed",
            AuthError::ClaimsTypeInvalid { .. } => "claims_type_invalid",
            AuthError::ClaimsInsufficient { .. } => "claims_insufficient",
            AuthError::IdentityClaimMissing { .. } => "identity_claim_missing",
            AuthError::UndeclaredOperation { .. } => "undeclared_operation",
            AuthError::NotAuthenticated => "not_authenticated",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::VerificationFailed(_)
            | AuthError::IdentityClaimMissing { .. } => StatusCode::UNAUTHORIZED,
            AuthError::ClaimsTypeInvalid { .. }
            | AuthError::ClaimsInsufficient { .. }
            | AuthError::UndeclaredOperation { .. } => StatusCode::FORBIDDEN,
            AuthError::NotAuthenticated => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this failure points at server-side configuration rather than the caller.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            AuthError::IdentityClaimMissing { .. }
                | AuthError::UndeclaredOperation { .. }
                | AuthError::NotAuthenticated
        )
    }

    fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => INVALID_CREDENTIALS_MESSAGE,
            StatusCode::FORBIDDEN => INSUFFICIENT_PERMISSIONS_MESSAGE,
            _ => INTERNAL_ERROR_MESSAGE,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            message: self.public_message(),
        });
        (status, body).into_response()
    }
}
