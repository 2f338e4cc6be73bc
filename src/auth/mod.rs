// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication against an identity provider, with claim
//! requirements taken from the API contract.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <ID token>`
//! 2. Server:
//!    - Extracts the credential ([`bearer_credential`])
//!    - Verifies it with the identity provider ([`TokenVerifier`])
//!    - Checks the claims the matched operation requires ([`authorize`])
//!    - Maps the claims to an [`Identity`]
//! 3. Handlers read the result with the [`Auth`] extractor
//!
//! ## Security
//!
//! - Every request is verified again; verification results are not cached
//! - Clients only see generic messages; details are logged
//! - Clock skew tolerance is 60 seconds

pub mod authorize;
pub mod claims;
pub mod contract;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod jwks;
pub mod jwks_provider;
pub mod local;
pub mod middleware;
pub mod provider;
pub mod token;

#[cfg(test)]
pub(crate) mod test_keys;

pub use authorize::{authorize, RequiredClaims};
pub use claims::{VerifiedClaims, PERMISSIONS_CLAIM};
pub use contract::{ContractError, OperationRegistry, BEARER_AUTH};
pub use error::AuthError;
pub use extractor::Auth;
pub use identity::Identity;
pub use jwks::JwksManager;
pub use jwks_provider::{JwksIdentityProvider, JwksProviderConfig};
pub use local::{LocalIdentityProvider, TokenSubject};
pub use middleware::{authenticate, AuthContext};
pub use provider::{IdentityProvider, ProviderError, TokenVerifier};
pub use token::{bearer_credential, Credential};
