use async_trait::async_trait;

use crate::domain::value_objects::GroupId;

#[derive(Debug, thiserror::Error)]
pub enum GroupPoolError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Which server pool each group draws from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupPoolPort: Send + Sync {
    async fn get_pool(&self, gid: &GroupId) -> Result<Option<String>, GroupPoolError>;
    async fn set_pool(&self, gid: &GroupId, pool: &str) -> Result<(), GroupPoolError>;
}
