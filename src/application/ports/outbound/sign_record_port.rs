use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::value_objects::{CharaId, GroupId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum SignRecordError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Durable goodwill totals and stamp collections, per (group, user)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignRecordPort: Send + Sync {
    /// Add `goodwill` and mark `day` as signed, in one step.
    ///
    /// Returns the new total, or `None` if the user already signed on `day`.
    async fn sign_in(
        &self,
        gid: &GroupId,
        uid: &UserId,
        day: NaiveDate,
        goodwill: u32,
    ) -> Result<Option<u32>, SignRecordError>;

    /// Put a stamp in the user's collection; `true` if it was not there yet
    async fn add_card(
        &self,
        gid: &GroupId,
        uid: &UserId,
        card: &CharaId,
    ) -> Result<bool, SignRecordError>;

    async fn cards(&self, gid: &GroupId, uid: &UserId) -> Result<Vec<CharaId>, SignRecordError>;

    /// 1-based place by collection size among the group's collectors,
    /// `None` for users who have nothing yet
    async fn collection_rank(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<Option<u32>, SignRecordError>;

    /// Highest goodwill first
    async fn goodwill_ranking(
        &self,
        gid: &GroupId,
        limit: u32,
    ) -> Result<Vec<(UserId, u32)>, SignRecordError>;

    /// 1-based place by goodwill, `None` for users who never signed in
    async fn goodwill_rank(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<Option<u32>, SignRecordError>;
}
