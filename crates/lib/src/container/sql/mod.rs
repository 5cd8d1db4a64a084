//! SQLite-backed container.
//!
//! Items live in a single `scope_items` table keyed by container key, with the
//! value stored as JSON text. The container goes through sqlx's `AnyPool` so the
//! same code path serves file databases and shared-cache in-memory databases.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{AnyPool, any::AnyPoolOptions};

use super::{ChangeHandlers, ContainerError, HandlerId, OnChangeHandler, StorageContainer};
use crate::{Error, Result, change::StorageChangeType, constants::ALL_KEYS};

/// Statements creating the schema. Each one is idempotent.
const CREATE_TABLES: &[&str] = &["CREATE TABLE IF NOT EXISTS scope_items (
        key TEXT PRIMARY KEY NOT NULL,
        value_json TEXT NOT NULL
    )"];

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Converts sqlx errors to `ContainerError::Sqlx` with a context message.
pub(crate) trait SqlxResultExt<T> {
    /// Convert sqlx error to ContainerError with context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            ContainerError::Sqlx {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

fn encode(value: &Value) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| -> Error { ContainerError::SerializationFailed { source: e }.into() })
}

fn decode(json: &str) -> Result<Value> {
    serde_json::from_str(json)
        .map_err(|e| -> Error { ContainerError::DeserializationFailed { source: e }.into() })
}

/// A container persisting items in a SQLite database.
///
/// # Thread Safety
///
/// The underlying sqlx pool handles connection pooling, so one `Sqlite` can be
/// shared by every view of a [`crate::Storage`].
pub struct Sqlite {
    pool: AnyPool,
    handlers: ChangeHandlers,
    attached: AtomicBool,
}

impl Sqlite {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    pub async fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        // mode=rwc: read-write-create
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect(&url).await
    }

    /// Connect to a SQLite database using a connection URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite:./my.db")
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let is_in_memory = url.contains("mode=memory");

        // A shared-cache in-memory database disappears with its last connection,
        // so keep one open for the lifetime of the pool.
        let pool = if is_in_memory {
            AnyPoolOptions::new()
                .max_connections(5)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?
        } else {
            AnyPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?
        };

        if is_in_memory {
            sqlx::query("PRAGMA busy_timeout = 5000;")
                .execute(&pool)
                .await
                .sql_context("Failed to configure SQLite")?;
        } else {
            sqlx::query(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
            .execute(&pool)
            .await
            .sql_context("Failed to configure SQLite")?;
        }

        for statement in CREATE_TABLES {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .sql_context("Failed to create schema")?;
        }

        tracing::debug!(url, "Connected SQLite container");
        Ok(Self {
            pool,
            handlers: ChangeHandlers::default(),
            attached: AtomicBool::new(false),
        })
    }

    /// Create an in-memory SQLite database.
    ///
    /// The database exists only for the lifetime of this container. Each call gets
    /// its own database.
    pub async fn in_memory() -> Result<Self> {
        let unique_id = uuid::Uuid::new_v4();
        let url = format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared");
        Self::connect(&url).await
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Number of change handlers currently registered.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Whether `attach()` was called more recently than `detach()`.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Applies a change written by another process sharing this database.
    ///
    /// `Some(value)` sets the key, `None` removes it. Registered change handlers
    /// are invoked afterwards with `UPDATE` or `DELETE`.
    pub async fn apply_external_change(&self, key: &str, value: Option<Value>) -> Result<()> {
        let change_type = match &value {
            Some(value) => {
                self.upsert(key, value).await?;
                StorageChangeType::Update
            }
            None => {
                self.delete(key).await?;
                StorageChangeType::Delete
            }
        };
        tracing::debug!(key, %change_type, "Applied external change");
        self.handlers.dispatch(change_type, key, value).await
    }

    /// Clears the database on behalf of an out-of-band writer.
    ///
    /// Handlers are invoked with `CLEARED` and [`ALL_KEYS`].
    pub async fn clear_external(&self) -> Result<()> {
        self.delete_all().await?;
        tracing::debug!("Applied external clear");
        self.handlers
            .dispatch(StorageChangeType::Cleared, ALL_KEYS, None)
            .await
    }

    async fn upsert(&self, key: &str, value: &Value) -> Result<()> {
        let json = encode(value)?;
        sqlx::query(
            "INSERT INTO scope_items (key, value_json) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value_json = excluded.value_json",
        )
        .bind(key)
        .bind(json)
        .execute(&self.pool)
        .await
        .sql_context("Failed to store item")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM scope_items WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .sql_context("Failed to remove item")?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM scope_items")
            .execute(&self.pool)
            .await
            .sql_context("Failed to clear items")?;
        Ok(())
    }
}

impl std::fmt::Debug for Sqlite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sqlite")
            .field("handlers", &self.handlers)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StorageContainer for Sqlite {
    fn register_on_change(&self, handler: OnChangeHandler) -> HandlerId {
        self.handlers.register(handler)
    }

    fn remove_on_change(&self, id: HandlerId) -> bool {
        self.handlers.remove(id)
    }

    async fn attach(&self) -> Result<()> {
        self.attached.store(true, Ordering::Release);
        tracing::info!("SQLite container attached");
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        self.attached.store(false, Ordering::Release);
        tracing::info!("SQLite container detached");
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value_json FROM scope_items WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .sql_context("Failed to get item")?;

        row.map(|(json,)| decode(&json)).transpose()
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.upsert(key, &value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.delete(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.delete_all().await
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value_json FROM scope_items")
                .fetch_all(&self.pool)
                .await
                .sql_context("Failed to list items")?;

        rows.into_iter()
            .map(|(key, json)| Ok((key, decode(&json)?)))
            .collect()
    }

    async fn has_item(&self, key: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM scope_items WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .sql_context("Failed to check item")?;
        Ok(row.is_some())
    }
}
