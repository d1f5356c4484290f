//! Game data service - the character roster and gacha pools as one snapshot
//!
//! Readers take an `Arc<GameData>` and keep using it for the whole request;
//! refreshes build a complete new snapshot and swap the reference, so nobody
//! ever observes a half-updated data set.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::application::ports::outbound::{DataStoreError, GameDataStorePort, PoolVersion};
use crate::domain::entities::{PoolRegistry, Roster};

/// Immutable data set shared by the gacha and guess services
#[derive(Debug, Clone, Default)]
pub struct GameData {
    pub roster: Roster,
    pub pools: PoolRegistry,
    pub pool_version: PoolVersion,
}

impl GameData {
    pub fn new(roster: Roster, pools: PoolRegistry, pool_version: PoolVersion) -> Self {
        Self {
            roster,
            pools,
            pool_version,
        }
    }

    /// Same roster, different pools
    pub fn with_pools(&self, pools: PoolRegistry, pool_version: PoolVersion) -> Self {
        Self {
            roster: self.roster.clone(),
            pools,
            pool_version,
        }
    }
}

pub struct GameDataService {
    current: RwLock<Arc<GameData>>,
}

impl GameDataService {
    pub fn new(data: GameData) -> Self {
        Self {
            current: RwLock::new(Arc::new(data)),
        }
    }

    /// Build the service from whatever the local cache holds
    pub async fn load(store: &dyn GameDataStorePort) -> Result<Self, DataStoreError> {
        let data = Self::read_store(store).await?;
        Ok(Self::new(data))
    }

    async fn read_store(store: &dyn GameDataStorePort) -> Result<GameData, DataStoreError> {
        let names = store.load_names().await?;
        let profiles = store.load_profiles().await?;
        let pools = store.load_pools().await?;
        let pool_version = store.load_pool_version().await?;

        let roster = Roster::new(names, profiles);
        for (alias, rejected, kept) in roster.collisions() {
            warn!(alias = %alias, rejected = %rejected, kept = %kept, "Duplicate character alias");
        }

        let (pools, rejected) = PoolRegistry::validated(pools);
        for e in rejected {
            warn!("Pool not loaded: {}", e);
        }

        info!(
            characters = roster.len(),
            profiles = roster.profile_count(),
            pools = pools.len(),
            pool_version = %pool_version.ver,
            "Game data loaded"
        );

        Ok(GameData::new(roster, pools, pool_version))
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<GameData> {
        self.current.read().await.clone()
    }

    /// Swap in a complete new data set, returning the previous one
    pub async fn replace(&self, data: GameData) -> Arc<GameData> {
        let mut current = self.current.write().await;
        std::mem::replace(&mut *current, Arc::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::MockGameDataStorePort;
    use crate::application::test_support::sample_data;
    use crate::domain::entities::Pool;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_snapshot_survives_replace() {
        let service = GameDataService::new(sample_data());
        let before = service.snapshot().await;

        let next = before.with_pools(PoolRegistry::default(), PoolVersion::new("42"));
        let previous = service.replace(next).await;

        // readers holding the old snapshot keep a complete view
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!before.pools.is_empty());

        let after = service.snapshot().await;
        assert!(after.pools.is_empty());
        assert_eq!(after.pool_version.ver, "42");
        assert_eq!(after.roster.len(), before.roster.len());
    }

    #[tokio::test]
    async fn test_load_reads_every_cache_file() {
        let mut store = MockGameDataStorePort::new();
        store.expect_load_names().times(1).returning(|| {
            let mut names = BTreeMap::new();
            names.insert("1018".into(), vec!["镜华".to_string()]);
            Ok(names)
        });
        store
            .expect_load_profiles()
            .times(1)
            .returning(|| Ok(BTreeMap::new()));
        store
            .expect_load_pools()
            .times(1)
            .returning(|| Ok(BTreeMap::new()));
        store
            .expect_load_pool_version()
            .times(1)
            .returning(|| Ok(PoolVersion::new("7")));

        let service = GameDataService::load(&store).await.unwrap();
        let data = service.snapshot().await;
        assert_eq!(data.roster.len(), 1);
        assert_eq!(data.pool_version.number(), 7);
    }

    #[tokio::test]
    async fn test_load_drops_pools_with_bad_rates() {
        let pool = |s2: u32| -> Pool {
            serde_json::from_value(serde_json::json!({
                "up_prob": 7, "s3_prob": 25, "s2_prob": s2,
                "up": ["镜华"], "star3": ["镜华"], "star2": ["佩可莉姆"], "star1": ["日和"]
            }))
            .unwrap()
        };
        let mut store = MockGameDataStorePort::new();
        store.expect_load_names().returning(|| Ok(BTreeMap::new()));
        store.expect_load_profiles().returning(|| Ok(BTreeMap::new()));
        store.expect_load_pools().returning(move || {
            let mut pools = BTreeMap::new();
            pools.insert("BL".to_string(), pool(180));
            pools.insert("JP".to_string(), pool(u32::MAX));
            Ok(pools)
        });
        store
            .expect_load_pool_version()
            .returning(|| Ok(PoolVersion::default()));

        let service = GameDataService::load(&store).await.unwrap();
        let data = service.snapshot().await;
        assert!(data.pools.get("BL").is_some());
        assert!(data.pools.get("JP").is_none());
    }

    #[tokio::test]
    async fn test_load_propagates_store_errors() {
        let mut store = MockGameDataStorePort::new();
        store
            .expect_load_names()
            .returning(|| Err(DataStoreError::Io("missing".to_string())));

        let result = GameDataService::load(&store).await;
        assert!(matches!(result, Err(DataStoreError::Io(_))));
    }
}
