//! Key/value accessors over the `kv_store` table
//!
//! Values are plain text; the `*_json` helpers store serde values as JSON.
//! Entries never expire.

use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;

/// Read a raw value
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Insert or replace a raw value
pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete one key; returns whether it existed
pub async fn remove(pool: &SqlitePool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Number of keys starting with `prefix`
pub async fn count_prefix(pool: &SqlitePool, prefix: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM kv_store WHERE substr(key, 1, ?) = ?")
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete every key starting with `prefix`; returns the number removed
pub async fn clear_prefix(pool: &SqlitePool, prefix: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM kv_store WHERE substr(key, 1, ?) = ?")
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Read and decode a JSON value.
///
/// A stored value that no longer decodes as `T` is an error; callers that
/// treat the store as a cache decide whether to ignore it.
pub async fn get_json<T: DeserializeOwned>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    match get(pool, key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and store a JSON value
pub async fn set_json<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    set(pool, key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        lat: f64,
        lon: f64,
    }

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let pool = init_memory_database().await.unwrap();

        assert_eq!(get(&pool, "a").await.unwrap(), None);

        set(&pool, "a", "1").await.unwrap();
        set(&pool, "a", "2").await.unwrap();
        assert_eq!(get(&pool, "a").await.unwrap().as_deref(), Some("2"));

        assert!(remove(&pool, "a").await.unwrap());
        assert!(!remove(&pool, "a").await.unwrap());
        assert_eq!(get(&pool, "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prefix_count_and_clear() {
        let pool = init_memory_database().await.unwrap();

        set(&pool, "geocode:paris-france", "{}").await.unwrap();
        set(&pool, "geocode:lyon-france", "{}").await.unwrap();
        set(&pool, "groupie_subscription", "{}").await.unwrap();

        assert_eq!(count_prefix(&pool, "geocode:").await.unwrap(), 2);
        assert_eq!(clear_prefix(&pool, "geocode:").await.unwrap(), 2);
        assert_eq!(count_prefix(&pool, "geocode:").await.unwrap(), 0);
        assert!(get(&pool, "groupie_subscription").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_json_round_trip_and_corrupt_value() {
        let pool = init_memory_database().await.unwrap();

        let point = Point { lat: 48.85, lon: 2.35 };
        set_json(&pool, "geocode:paris", &point).await.unwrap();
        let loaded: Option<Point> = get_json(&pool, "geocode:paris").await.unwrap();
        assert_eq!(loaded, Some(point));

        set(&pool, "geocode:broken", "not json").await.unwrap();
        let broken: Result<Option<Point>> = get_json(&pool, "geocode:broken").await;
        assert!(broken.is_err());
    }
}
