use async_trait::async_trait;

use crate::domain::entities::GuessVariant;
use crate::domain::value_objects::{GroupId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum WinRecordError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Durable per-(variant, group, user) win counters
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WinRecordPort: Send + Sync {
    /// Increment and return the new count
    async fn record_win(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
        uid: &UserId,
    ) -> Result<u32, WinRecordError>;

    /// Highest counts first
    async fn ranking(
        &self,
        variant: GuessVariant,
        gid: &GroupId,
        limit: u32,
    ) -> Result<Vec<(UserId, u32)>, WinRecordError>;
}
