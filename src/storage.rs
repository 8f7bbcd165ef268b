//! Persisted key-value state.
//!
//! One SQLite table of `key -> text`. Values are whole JSON documents (or a raw
//! string for the sender name) and are always overwritten in full.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// Where an unreadable value under `key` is preserved
pub fn backup_key(key: &str) -> String {
    format!("{key}.corrupt")
}

pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if needed) the store at the given path
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open store at {}", path.display()))?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Open an in-memory store (for testing)
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A single connection: every in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to create in-memory connection pool")?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to initialize store schema")?;

        Ok(())
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read key {key}"))?;

        Ok(row.map(|row| row.get("value")))
    }

    pub async fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write key {key}"))?;

        tracing::debug!(key, bytes = value.len(), "stored");
        Ok(())
    }

    /// Read and decode a JSON value.
    ///
    /// A missing key is `None`. A value that does not decode is logged, copied
    /// to the key's backup slot, and also treated as `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, "Ignoring unreadable stored value: {}", e);
                self.back_up(key, &raw).await?;
                Ok(None)
            }
        }
    }

    /// Read a JSON array, decoding each record on its own.
    ///
    /// Records that do not decode are skipped. If any are skipped, or the
    /// value is not an array at all, the raw value is backed up first.
    pub async fn get_json_list<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let Some(records) = self.get_json::<Vec<serde_json::Value>>(key).await? else {
            return Ok(None);
        };

        let total = records.len();
        let items: Vec<T> = records
            .into_iter()
            .enumerate()
            .filter_map(|(idx, record)| match serde_json::from_value(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(key, idx, "Skipping unreadable stored record: {}", e);
                    None
                }
            })
            .collect();

        if items.len() != total {
            if let Some(raw) = self.get_raw(key).await? {
                self.back_up(key, &raw).await?;
            }
        }
        Ok(Some(items))
    }

    /// Copy an unreadable value to `<key>.corrupt` so a later overwrite of
    /// `key` cannot lose it.
    async fn back_up(&self, key: &str, raw: &str) -> Result<()> {
        let backup = backup_key(key);
        self.set_raw(&backup, raw).await?;
        tracing::warn!(key, backup = %backup, "Backed up unreadable stored value");
        Ok(())
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize value for {key}"))?;
        self.set_raw(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Category;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let storage = Storage::open_in_memory().await.unwrap();
        assert_eq!(storage.get_raw("templates").await.unwrap(), None);
        let categories: Option<Vec<Category>> = storage.get_json("categories").await.unwrap();
        assert!(categories.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let storage = Storage::open_in_memory().await.unwrap();
        storage.set_raw("myName", "鈴木").await.unwrap();
        storage.set_raw("myName", "佐藤").await.unwrap();
        assert_eq!(
            storage.get_raw("myName").await.unwrap(),
            Some("佐藤".to_string())
        );
    }

    #[tokio::test]
    async fn test_json_value_stored_as_text() {
        let storage = Storage::open_in_memory().await.unwrap();
        let categories = vec![Category::new("1", "研究関連", "#0891b2")];
        storage.set_json("categories", &categories).await.unwrap();

        let raw = storage.get_raw("categories").await.unwrap().unwrap();
        assert_eq!(raw, r##"[{"id":"1","name":"研究関連","color":"#0891b2"}]"##);

        let back: Vec<Category> = storage.get_json("categories").await.unwrap().unwrap();
        assert_eq!(back, categories);
    }

    #[tokio::test]
    async fn test_corrupt_json_reads_as_absent_and_is_backed_up() {
        let storage = Storage::open_in_memory().await.unwrap();
        storage.set_raw("professors", "[{not json").await.unwrap();
        let professors: Option<Vec<crate::store::Professor>> =
            storage.get_json_list("professors").await.unwrap();
        assert!(professors.is_none());
        assert_eq!(
            storage.get_raw(&backup_key("professors")).await.unwrap(),
            Some("[{not json".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_keeps_readable_records() {
        let storage = Storage::open_in_memory().await.unwrap();
        let raw = r##"[{"id":"1","name":"研究関連","color":"#0891b2"},{"id":"2"}]"##;
        storage.set_raw("categories", raw).await.unwrap();

        let categories: Vec<Category> = storage.get_json_list("categories").await.unwrap().unwrap();
        assert_eq!(categories, vec![Category::new("1", "研究関連", "#0891b2")]);
        assert_eq!(
            storage.get_raw(&backup_key("categories")).await.unwrap(),
            Some(raw.to_string())
        );
    }

    #[tokio::test]
    async fn test_clean_list_writes_no_backup() {
        let storage = Storage::open_in_memory().await.unwrap();
        storage
            .set_json("categories", &[Category::new("1", "a", "#000000")])
            .await
            .unwrap();
        let categories: Vec<Category> = storage.get_json_list("categories").await.unwrap().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(storage.get_raw(&backup_key("categories")).await.unwrap(), None);
    }
}
