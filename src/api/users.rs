// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! Every route here sits behind the authentication middleware. Required
//! claims come from the `security` declared on each operation below.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreateUserRequest, ErrorResponse, User},
    state::AppState,
    storage::{UserId, UserRecord},
};

/// Claim required to create users.
pub const WRITE_CLAIM: &str = "things:w";

/// List all users.
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "All users, ordered by id", body = [User]),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn list_users(
    Auth(_auth): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(User::from).collect()))
}

/// Get a single user by id.
#[utoipa::path(
    get,
    path = "/users/{userId}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(
        ("userId" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(
    Auth(_auth): Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id =
        UserId::parse(user_id).map_err(|_| ApiError::bad_request("Invalid user id"))?;

    let user = state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {user_id} not found")))?;

    Ok(Json(user.into()))
}

/// Create a user.
///
/// The id is taken from the body when present, otherwise generated.
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("bearerAuth" = ["things:w"])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 403, description = "Token lacks the things:w claim", body = ErrorResponse),
        (status = 409, description = "A user with this id already exists", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn create_user(
    Auth(auth): Auth,
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected user body");
        ApiError::bad_request("Invalid request body")
    })?;

    if let Some(field) = request.blank_field() {
        return Err(ApiError::bad_request(format!("{field} must not be blank")));
    }

    let id = match request.id {
        Some(id) => UserId::parse(id).map_err(|_| ApiError::bad_request("Invalid user id"))?,
        None => UserId::generate(),
    };

    let record = UserRecord {
        id: id.clone(),
        name: request.name,
        email: request.email,
        password: request.password,
        created_at: Utc::now(),
    };
    state.users.add_user(record).await?;

    tracing::info!(user_id = %id, actor = %auth.identity.subject_id, "user created");
    Ok(StatusCode::CREATED)
}
