use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::application::ports::outbound::{GroupPoolError, GroupPoolPort};
use crate::domain::value_objects::GroupId;

pub struct SqliteGroupPoolRepository {
    pool: SqlitePool,
}

impl SqliteGroupPoolRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_pool (
                gid TEXT PRIMARY KEY,
                pool TEXT NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl GroupPoolPort for SqliteGroupPoolRepository {
    async fn get_pool(&self, gid: &GroupId) -> Result<Option<String>, GroupPoolError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT pool FROM group_pool WHERE gid = ?")
            .bind(gid.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GroupPoolError::Database(e.to_string()))?;

        Ok(row.map(|(pool,)| pool))
    }

    async fn set_pool(&self, gid: &GroupId, pool: &str) -> Result<(), GroupPoolError> {
        sqlx::query(
            "INSERT OR REPLACE INTO group_pool (gid, pool, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
        )
        .bind(gid.as_str())
        .bind(pool)
        .execute(&self.pool)
        .await
        .map_err(|e| GroupPoolError::Database(e.to_string()))?;

        Ok(())
    }
}
