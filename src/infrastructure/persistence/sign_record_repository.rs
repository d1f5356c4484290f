use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::application::ports::outbound::{SignRecordError, SignRecordPort};
use crate::domain::value_objects::{CharaId, GroupId, UserId};

fn db_error(e: sqlx::Error) -> SignRecordError {
    SignRecordError::Database(e.to_string())
}

pub struct SqliteSignRecordRepository {
    pool: SqlitePool,
}

impl SqliteSignRecordRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sign_record (
                gid TEXT NOT NULL,
                uid TEXT NOT NULL,
                goodwill INTEGER NOT NULL,
                last_day TEXT NOT NULL,
                PRIMARY KEY (gid, uid)
            )
        "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS card_record (
                gid TEXT NOT NULL,
                uid TEXT NOT NULL,
                cid TEXT NOT NULL,
                num INTEGER NOT NULL,
                PRIMARY KEY (gid, uid, cid)
            )
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SignRecordPort for SqliteSignRecordRepository {
    async fn sign_in(
        &self,
        gid: &GroupId,
        uid: &UserId,
        day: NaiveDate,
        goodwill: u32,
    ) -> Result<Option<u32>, SignRecordError> {
        // the conflict branch only fires on a new day, otherwise nothing is returned
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO sign_record (gid, uid, goodwill, last_day) VALUES (?, ?, ?, ?)
            ON CONFLICT (gid, uid) DO UPDATE
                SET goodwill = goodwill + excluded.goodwill, last_day = excluded.last_day
                WHERE last_day <> excluded.last_day
            RETURNING goodwill
        "#,
        )
        .bind(gid.as_str())
        .bind(uid.as_str())
        .bind(i64::from(goodwill))
        .bind(day.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(total,)| total as u32))
    }

    async fn add_card(
        &self,
        gid: &GroupId,
        uid: &UserId,
        card: &CharaId,
    ) -> Result<bool, SignRecordError> {
        let (num,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO card_record (gid, uid, cid, num) VALUES (?, ?, ?, 1)
            ON CONFLICT (gid, uid, cid) DO UPDATE SET num = num + 1
            RETURNING num
        "#,
        )
        .bind(gid.as_str())
        .bind(uid.as_str())
        .bind(card.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(num == 1)
    }

    async fn cards(&self, gid: &GroupId, uid: &UserId) -> Result<Vec<CharaId>, SignRecordError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT cid FROM card_record WHERE gid = ? AND uid = ? AND num > 0 ORDER BY cid",
        )
        .bind(gid.as_str())
        .bind(uid.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|(cid,)| CharaId::new(cid)).collect())
    }

    async fn collection_rank(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<Option<u32>, SignRecordError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            WITH sizes AS (
                SELECT uid, COUNT(*) AS n FROM card_record
                WHERE gid = ? AND num > 0 GROUP BY uid
            )
            SELECT (SELECT COUNT(*) FROM sizes other WHERE other.n > own.n) + 1
            FROM sizes own WHERE own.uid = ?
        "#,
        )
        .bind(gid.as_str())
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(rank,)| rank as u32))
    }

    async fn goodwill_ranking(
        &self,
        gid: &GroupId,
        limit: u32,
    ) -> Result<Vec<(UserId, u32)>, SignRecordError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT uid, goodwill FROM sign_record WHERE gid = ? ORDER BY goodwill DESC, uid ASC LIMIT ?",
        )
        .bind(gid.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(uid, goodwill)| (UserId::from(uid), goodwill as u32))
            .collect())
    }

    async fn goodwill_rank(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<Option<u32>, SignRecordError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM sign_record other
                    WHERE other.gid = own.gid AND other.goodwill > own.goodwill) + 1
            FROM sign_record own WHERE own.gid = ? AND own.uid = ?
        "#,
        )
        .bind(gid.as_str())
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(rank,)| rank as u32))
    }
}
