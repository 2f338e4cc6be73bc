// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository backed by redb (pure Rust, ACID).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{
    RepositoryError, RepositoryResult, StoreError, UserId, UserRecord, UserRepository,
};

/// user_id → serialized UserRecord (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Database file name inside the data directory.
pub const USERS_DB_FILE: &str = "users.redb";

#[derive(Clone)]
pub struct RedbUserRepository {
    db: Arc<Database>,
}

impl RedbUserRepository {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open `users.redb` inside a data directory.
    pub fn open_in(data_dir: &Path) -> Result<Self, StoreError> {
        Self::open(&data_dir.join(USERS_DB_FILE))
    }

    /// Run blocking redb work off the async executor.
    async fn blocking<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || work(&db)).await?
    }
}

/// Insert unless the key exists, in a single write transaction.
fn create_if_absent(db: &Database, id: &str, document: &[u8]) -> Result<bool, StoreError> {
    let write_txn = db.begin_write()?;
    let inserted = {
        let mut table = write_txn.open_table(USERS)?;
        let exists = table.get(id)?.is_some();
        if !exists {
            table.insert(id, document)?;
        }
        !exists
    };

    if inserted {
        write_txn.commit()?;
    } else {
        write_txn.abort()?;
    }
    Ok(inserted)
}

#[async_trait]
impl UserRepository for RedbUserRepository {
    async fn add_user(&self, user: UserRecord) -> RepositoryResult<()> {
        let document = serde_json::to_vec(&user).map_err(StoreError::from)?;
        let key = user.id.to_string();

        let inserted = self
            .blocking(move |db| create_if_absent(db, &key, &document))
            .await?;

        if inserted {
            Ok(())
        } else {
            Err(RepositoryError::DuplicateUser(user.id))
        }
    }

    async fn get_user(&self, id: &UserId) -> RepositoryResult<Option<UserRecord>> {
        let key = id.to_string();
        let user = self
            .blocking(move |db| {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(USERS)?;
                let user = match table.get(key.as_str())? {
                    Some(value) => Some(serde_json::from_slice::<UserRecord>(value.value())?),
                    None => None,
                };
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> RepositoryResult<Vec<UserRecord>> {
        let users = self
            .blocking(|db| {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(USERS)?;
                let mut users = Vec::new();
                for entry in table.iter()? {
                    let (_, value) = entry?;
                    users.push(serde_json::from_slice::<UserRecord>(value.value())?);
                }
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    async fn check_ready(&self) -> RepositoryResult<()> {
        self.blocking(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(USERS)?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}
