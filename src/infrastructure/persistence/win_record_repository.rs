use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::application::ports::outbound::{WinRecordError, WinRecordPort};
use crate::domain::entities::GuessVariant;
use crate::domain::value_objects::{GroupId, UserId};

/// Guess-game win counters, one row per (variant, group, user)
pub struct SqliteWinRecordRepository {
    pool: SqlitePool,
}

impl SqliteWinRecordRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS win_record (
                variant TEXT NOT NULL,
                gid TEXT NOT NULL,
                uid TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (variant, gid, uid)
            )
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl WinRecordPort for SqliteWinRecordRepository {
    async fn record_win(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<u32, WinRecordError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO win_record (variant, gid, uid, count) VALUES (?, ?, ?, 1)
            ON CONFLICT (variant, gid, uid) DO UPDATE SET count = count + 1
            RETURNING count
        "#,
        )
        .bind(variant.as_str())
        .bind(gid.as_str())
        .bind(uid.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WinRecordError::Database(e.to_string()))?;

        Ok(count as u32)
    }

    async fn ranking(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
        limit: u32,
    ) -> Result<Vec<(UserId, u32)>, WinRecordError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT uid, count FROM win_record WHERE variant = ? AND gid = ? ORDER BY count DESC, uid ASC LIMIT ?",
        )
        .bind(variant.as_str())
        .bind(gid.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WinRecordError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(uid, count)| (UserId::from(uid), count as u32))
            .collect())
    }
}
