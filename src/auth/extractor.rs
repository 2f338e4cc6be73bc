// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated caller.
//!
//! Use the `Auth` extractor in handlers on routes guarded by
//! [`super::middleware::authenticate`]:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(auth): Auth) -> impl IntoResponse {
//!     // auth.identity is the caller's Identity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthContext, AuthError};

/// Extractor for the authentication context set by the middleware.
///
/// Rejects with [`AuthError::NotAuthenticated`] (500) when the route is not
/// behind the authentication middleware.
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::NotAuthenticated)
    }
}
