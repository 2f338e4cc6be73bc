// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{OperationRegistry, TokenVerifier};
use crate::storage::UserRepository;

/// Shared, read-only request context. Cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub verifier: TokenVerifier,
    pub users: Arc<dyn UserRepository>,
    pub operations: Arc<OperationRegistry>,
}

impl AppState {
    pub fn new(
        verifier: TokenVerifier,
        users: Arc<dyn UserRepository>,
        operations: OperationRegistry,
    ) -> Self {
        Self {
            verifier,
            users,
            operations: Arc::new(operations),
        }
    }
}
