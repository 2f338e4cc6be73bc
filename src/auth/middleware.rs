// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied with `route_layer` so the matched route template is known:
//!
//! ```rust,ignore
//! let users = Router::new()
//!     .route("/users", get(list_users))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), authenticate));
//! ```
//!
//! Steps run strictly in order and stop at the first failure:
//! extract credential, verify it, check the operation's required claims,
//! derive the identity. On success an [`AuthContext`] is inserted into the
//! request extensions.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::contract::OperationRegistry;
use super::{authorize, bearer_credential, AuthError, Identity, TokenVerifier, VerifiedClaims};
use crate::state::AppState;

/// Result of a successful authentication, scoped to one request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
    pub claims: Arc<VerifiedClaims>,
}

/// Authentication middleware function.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned());

    let result = authenticate_request(
        &state.verifier,
        &state.operations,
        &method,
        route.as_deref(),
        request.headers(),
    )
    .await;

    match result {
        Ok(context) => {
            tracing::debug!(
                subject = %context.identity.subject_id,
                %method,
                route = route.as_deref().unwrap_or_default(),
                "request authenticated"
            );
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(error) => {
            log_rejection(&error, &method, route.as_deref());
            error.into_response()
        }
    }
}

/// Run the authentication pipeline for one request.
pub async fn authenticate_request(
    verifier: &TokenVerifier,
    operations: &OperationRegistry,
    method: &Method,
    route: Option<&str>,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let credential = bearer_credential(headers)?;
    let claims = verifier.verify(&credential).await?;

    let required = operations.required_claims(method, route)?;
    authorize(&claims, required)?;

    let identity = Identity::from_claims(&claims)?;

    Ok(AuthContext {
        identity,
        claims: Arc::new(claims),
    })
}

fn log_rejection(error: &AuthError, method: &Method, route: Option<&str>) {
    let route = route.unwrap_or_default();
    if error.is_misconfiguration() {
        tracing::error!(
            error_code = error.error_code(),
            error = %error,
            %method,
            route,
            "request rejected: authentication misconfigured"
        );
    } else {
        tracing::warn!(
            error_code = error.error_code(),
            error = %error,
            %method,
            route,
            "request authentication rejected"
        );
    }
}
