use chrono::Utc;
use sqlx::Row;

use super::{LocalStateRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLocalStateRepository {
    pool: DbPool,
}

impl SqlLocalStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LocalStateRepository for SqlLocalStateRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT value_json FROM local_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<String, _>("value_json")))
    }

    async fn put(&self, key: &str, value_json: String) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO local_state (key, value_json, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM local_state WHERE key = ?").bind(key).execute(&self.pool).await?;
        Ok(())
    }
}
