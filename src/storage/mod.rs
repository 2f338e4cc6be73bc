// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Storage
//!
//! Users are JSON documents in an embedded redb database, keyed by id.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   users.redb
//!     users: user_id -> JSON document
//! ```
//!
//! Id uniqueness is enforced by the store at write time: the existence
//! check and the insert run inside one write transaction, and redb
//! serializes write transactions.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod users;

pub use users::RedbUserRepository;

/// Longest accepted user id.
pub const MAX_USER_ID_LEN: usize = 128;

/// Unique user identifier.
///
/// Non-empty, at most [`MAX_USER_ID_LEN`] characters, no `/`, no surrounding
/// whitespace. Server-generated ids are UUID v4 strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Fresh random id.
    pub fn generate() -> Self {
        UserId(Uuid::new_v4().to_string())
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidUserId> {
        let value = value.into();
        if value.is_empty()
            || value.len() > MAX_USER_ID_LEN
            || value.trim() != value
            || value.contains('/')
            || value.chars().any(char::is_control)
        {
            return Err(InvalidUserId(value));
        }
        Ok(UserId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::parse(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid user id {0:?}")]
pub struct InvalidUserId(pub String);

/// User document.
///
/// The password is stored exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// Low-level store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Repository failure as seen by handlers.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A user with this id already exists.
    #[error("user {0} already exists")]
    DuplicateUser(UserId),

    /// Transport or store failure; retry only with a freshly generated id.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence port for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user; fails with `DuplicateUser` if the id is taken.
    async fn add_user(&self, user: UserRecord) -> RepositoryResult<()>;

    async fn get_user(&self, id: &UserId) -> RepositoryResult<Option<UserRecord>>;

    /// All users, ordered by id.
    async fn list_users(&self) -> RepositoryResult<Vec<UserRecord>>;

    /// Whether the store can serve requests.
    async fn check_ready(&self) -> RepositoryResult<()>;
}
