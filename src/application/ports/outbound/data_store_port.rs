use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::application::ports::outbound::PoolVersion;
use crate::domain::entities::Pool;
use crate::domain::value_objects::CharaId;

#[derive(Debug, thiserror::Error)]
pub enum DataStoreError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CharaNames = BTreeMap<CharaId, Vec<String>>;
pub type CharaProfiles = BTreeMap<CharaId, BTreeMap<String, String>>;

/// Local cache of character and pool data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameDataStorePort: Send + Sync {
    async fn load_names(&self) -> Result<CharaNames, DataStoreError>;
    async fn load_profiles(&self) -> Result<CharaProfiles, DataStoreError>;
    async fn load_pools(&self) -> Result<BTreeMap<String, Pool>, DataStoreError>;
    async fn load_pool_version(&self) -> Result<PoolVersion, DataStoreError>;

    async fn save_pools(&self, pools: &BTreeMap<String, Pool>) -> Result<(), DataStoreError>;
    async fn backup_pools(&self, pools: &BTreeMap<String, Pool>) -> Result<(), DataStoreError>;
    async fn save_pool_version(&self, version: &PoolVersion) -> Result<(), DataStoreError>;
}
