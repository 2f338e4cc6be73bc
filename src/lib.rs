// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Users API - bearer-token authenticated user management service
//!
//! Every `/users` request is authenticated against an identity provider and
//! checked against the claims its operation declares in the OpenAPI contract.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Credential extraction, verification and claim checks
//! - `config` - Environment configuration
//! - `server` - Startup wiring and serve loop
//! - `storage` - User repository (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod state;
pub mod storage;
pub mod telemetry;
