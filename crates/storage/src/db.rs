use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored record '{key}' is not valid JSON: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub async fn create_db(path: &Path) -> Result<DbPool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Reads a JSON record by key. A missing key is `Ok(None)`.
pub async fn get_record<T: DeserializeOwned>(
    pool: &DbPool,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let row = sqlx::query_as::<_, (String,)>("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    row.map(|(value,)| {
        serde_json::from_str(&value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })
    })
    .transpose()
}

pub async fn put_record<T: Serialize + ?Sized>(
    pool: &DbPool,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;

    sqlx::query(
        "INSERT INTO kv_store (key, value) VALUES (?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
    )
    .bind(key)
    .bind(json)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();
        let value: Option<Vec<String>> = get_record(&pool, "nothing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();

        put_record(&pool, "k", &vec![1, 2, 3]).await.unwrap();
        put_record(&pool, "k", &vec![4]).await.unwrap();

        let value: Option<Vec<i32>> = get_record(&pool, "k").await.unwrap();
        assert_eq!(value, Some(vec![4]));
    }

    #[tokio::test]
    async fn reopening_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let pool = create_db(&path).await.unwrap();
            let mut map = BTreeMap::new();
            map.insert("a".to_string(), 1);
            put_record(&pool, "m", &map).await.unwrap();
            pool.close().await;
        }
        let pool = create_db(&path).await.unwrap();
        let value: Option<BTreeMap<String, i32>> = get_record(&pool, "m").await.unwrap();
        assert_eq!(value.unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();
        sqlx::query("INSERT INTO kv_store (key, value) VALUES ('bad', '{not json')")
            .execute(&pool)
            .await
            .unwrap();
        let result: Result<Option<Vec<i32>>, _> = get_record(&pool, "bad").await;
        assert!(matches!(result, Err(StoreError::Serialization { .. })));
    }
}
