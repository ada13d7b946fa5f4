//! SQLite implementation of the Identity Service and Message Store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::models::{
    MessageRow, NewAccount, UserRow, identity_from_row, message_from_row,
};
use crate::config::GatewayConfig;
use crate::domain::{ChatMessage, MessageId, UserId, UserIdentity};
use crate::error::GatewayError;
use crate::service::{IdentityService, MessageStore};

/// Schema statements, applied in order on every start.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        token TEXT UNIQUE NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_user_id INTEGER NOT NULL REFERENCES users (id),
        to_user_id INTEGER NOT NULL REFERENCES users (id),
        content TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_unread ON messages (to_user_id, is_read, id)",
];

/// Upper bound on bound parameters per `UPDATE ... IN (...)` statement.
const MARK_READ_CHUNK: usize = 500;

/// SQLite-backed identity lookups and message storage using `sqlx::SqlitePool`.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Wraps an existing pool. The schema is not touched.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database named by `config.database_url`, creating the file
    /// if needed, and applies the schema.
    ///
    /// In-memory databases are limited to one never-recycled connection,
    /// since every SQLite connection to `:memory:` is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] if the URL is invalid, the
    /// database cannot be opened, or the schema cannot be applied.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = config.database_url.contains(":memory:")
            || config.database_url.contains("mode=memory");

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs));
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.database_max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        let backend = Self::new(pool);
        backend.migrate().await?;

        tracing::info!(url = %config.database_url, "database ready");
        Ok(backend)
    }

    /// Opens a fresh private in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] if SQLite cannot be opened.
    pub async fn in_memory() -> Result<Self, GatewayError> {
        Self::connect(&GatewayConfig::default()).await
    }

    /// Applies the schema. Safe to run repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] on database failure.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates an account and issues its bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a blank username or a
    /// username/email that is already taken, and
    /// [`GatewayError::StoreFailure`] on database failure.
    pub async fn create_user(&self, username: &str, email: &str) -> Result<NewAccount, GatewayError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "username must not be empty".to_string(),
            ));
        }
        let token = uuid::Uuid::new_v4().simple().to_string();

        let result = sqlx::query(
            "INSERT INTO users (username, email, token, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email.trim())
        .bind(&token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                GatewayError::InvalidRequest("username or email already taken".to_string())
            }
            other => GatewayError::from(other),
        })?;

        let identity = UserIdentity::new(UserId::new(result.last_insert_rowid()), username);
        tracing::info!(user_id = %identity.user_id, username, "user created");
        Ok(NewAccount { identity, token })
    }
}

#[async_trait]
impl IdentityService for SqliteBackend {
    async fn verify_token(&self, token: &str) -> Result<Option<UserIdentity>, GatewayError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(identity_from_row))
    }

    async fn resolve_username(
        &self,
        username: &str,
    ) -> Result<Option<UserIdentity>, GatewayError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(identity_from_row))
    }
}

#[async_trait]
impl MessageStore for SqliteBackend {
    async fn append(
        &self,
        from: UserId,
        to: UserId,
        content: &str,
    ) -> Result<MessageId, GatewayError> {
        let result = sqlx::query(
            "INSERT INTO messages (from_user_id, to_user_id, content, is_read, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(from.get())
        .bind(to.get())
        .bind(content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(MessageId::new(result.last_insert_rowid()))
    }

    async fn list_unread(&self, user: UserId) -> Result<Vec<ChatMessage>, GatewayError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, from_user_id, to_user_id, content, is_read, created_at FROM messages \
             WHERE to_user_id = ? AND is_read = 0 ORDER BY id ASC",
        )
        .bind(user.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<(), GatewayError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in ids.chunks(MARK_READ_CHUNK) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "UPDATE messages SET is_read = 1 WHERE is_read = 0 AND id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.get());
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn backend() -> SqliteBackend {
        let Ok(backend) = SqliteBackend::in_memory().await else {
            panic!("in-memory sqlite should open");
        };
        backend
    }

    async fn account(backend: &SqliteBackend, name: &str) -> NewAccount {
        let Ok(account) = backend
            .create_user(name, &format!("{name}@example.com"))
            .await
        else {
            panic!("create_user {name} failed");
        };
        account
    }

    #[tokio::test]
    async fn token_and_username_resolve_to_same_user() {
        let backend = backend().await;
        let alice = account(&backend, "alice").await;

        let by_token = backend.verify_token(&alice.token).await.ok().flatten();
        let by_name = backend.resolve_username("alice").await.ok().flatten();
        assert_eq!(by_token.as_ref(), Some(&alice.identity));
        assert_eq!(by_name.as_ref(), Some(&alice.identity));
    }

    #[tokio::test]
    async fn unknown_token_and_username_are_not_found() {
        let backend = backend().await;
        assert!(matches!(backend.verify_token("nope").await, Ok(None)));
        assert!(matches!(backend.resolve_username("ghost").await, Ok(None)));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let backend = backend().await;
        account(&backend, "alice").await;
        let dup = backend.create_user("alice", "other@example.com").await;
        assert!(matches!(dup, Err(GatewayError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn tokens_are_unique_per_user() {
        let backend = backend().await;
        let alice = account(&backend, "alice").await;
        let bob = account(&backend, "bob").await;
        assert_ne!(alice.token, bob.token);
    }

    #[tokio::test]
    async fn append_list_and_mark_read() {
        let backend = backend().await;
        let alice = account(&backend, "alice").await.identity;
        let bob = account(&backend, "bob").await.identity;

        let Ok(first) = backend.append(alice.user_id, bob.user_id, "first").await else {
            panic!("append failed");
        };
        let Ok(second) = backend.append(alice.user_id, bob.user_id, "second").await else {
            panic!("append failed");
        };
        assert!(second > first);

        let Ok(unread) = backend.list_unread(bob.user_id).await else {
            panic!("list failed");
        };
        let contents: Vec<&str> = unread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(unread.iter().all(|m| !m.read && m.from_user_id == alice.user_id));

        assert!(backend.list_unread(alice.user_id).await.is_ok_and(|v| v.is_empty()));

        assert!(backend.mark_read(&[first]).await.is_ok());
        let Ok(unread) = backend.list_unread(bob.user_id).await else {
            panic!("list failed");
        };
        assert_eq!(unread.len(), 1);
        assert_eq!(unread.first().map(|m| m.id), Some(second));
    }

    #[tokio::test]
    async fn mark_read_is_monotonic_and_empty_is_noop() {
        let backend = backend().await;
        let alice = account(&backend, "alice").await.identity;
        let bob = account(&backend, "bob").await.identity;
        let Ok(id) = backend.append(alice.user_id, bob.user_id, "hi").await else {
            panic!("append failed");
        };

        assert!(backend.mark_read(&[]).await.is_ok());
        assert!(backend.list_unread(bob.user_id).await.is_ok_and(|v| v.len() == 1));

        assert!(backend.mark_read(&[id]).await.is_ok());
        assert!(backend.mark_read(&[id]).await.is_ok());

        let read: Result<bool, _> = sqlx::query_scalar("SELECT is_read FROM messages WHERE id = ?")
            .bind(id.get())
            .fetch_one(backend.pool())
            .await;
        assert!(read.is_ok_and(|r| r));
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let backend = backend().await;
        assert!(backend.migrate().await.is_ok());
    }
}
