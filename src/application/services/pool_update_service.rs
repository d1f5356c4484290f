//! Pool Update Service - refresh gacha pools from the remote publisher
//!
//! A refresh only happens when the published version is newer than ours.
//! The new pools are built off to the side, swapped into the live data set
//! in one step, and only then written to the local cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::application::ports::outbound::{
    DataStoreError, GameDataStorePort, PoolSourceError, PoolSourcePort, PoolVersion,
};
use crate::application::services::GameDataService;
use crate::domain::entities::{canonical_server, Pool, PoolRegistry, RawPool, Roster};
use crate::domain::value_objects::CharaId;

#[derive(Debug, thiserror::Error)]
pub enum PoolUpdateError {
    #[error("Pool source unavailable: {0}")]
    Source(#[from] PoolSourceError),
    /// The new pools are live but could not be written to the local cache
    #[error("Pools updated to {version} but not persisted: {source}")]
    Persist {
        version: String,
        #[source]
        source: DataStoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "version", rename_all = "snake_case")]
pub enum PoolUpdateOutcome {
    AlreadyLatest(String),
    Updated(String),
}

pub struct PoolUpdateService {
    data: Arc<GameDataService>,
    source: Arc<dyn PoolSourcePort>,
    store: Arc<dyn GameDataStorePort>,
    filler: String,
}

impl PoolUpdateService {
    pub fn new(
        data: Arc<GameDataService>,
        source: Arc<dyn PoolSourcePort>,
        store: Arc<dyn GameDataStorePort>,
        filler: impl Into<String>,
    ) -> Self {
        Self {
            data,
            source,
            store,
            filler: filler.into(),
        }
    }

    /// Check the published version and refresh when it is newer.
    /// `force` ignores the local version.
    #[instrument(skip(self))]
    pub async fn update_pools(&self, force: bool) -> Result<PoolUpdateOutcome, PoolUpdateError> {
        let current = self.data.snapshot().await;
        let local = if force {
            PoolVersion::default()
        } else {
            current.pool_version.clone()
        };

        let remote = self.source.fetch_version().await?;
        if remote.number() <= local.number() {
            info!(version = %remote.ver, "Pools already up to date");
            return Ok(PoolUpdateOutcome::AlreadyLatest(remote.ver));
        }

        let raw = self.source.fetch_pools().await?;
        let pools = merge_pools(current.pools.pools(), &raw, &current.roster, &self.filler);
        let registry = PoolRegistry::new(pools.clone());

        self.data
            .replace(current.with_pools(registry, remote.clone()))
            .await;
        info!(from = %local.ver, to = %remote.ver, pools = pools.len(), "Pools updated");

        self.persist(current.pools.pools(), &pools, &remote)
            .await
            .map_err(|source| {
                error!(error = %source, "Failed to persist updated pools");
                PoolUpdateError::Persist {
                    version: remote.ver.clone(),
                    source,
                }
            })?;

        Ok(PoolUpdateOutcome::Updated(remote.ver))
    }

    async fn persist(
        &self,
        previous: &BTreeMap<String, Pool>,
        pools: &BTreeMap<String, Pool>,
        version: &PoolVersion,
    ) -> Result<(), DataStoreError> {
        self.store.backup_pools(previous).await?;
        self.store.save_pools(pools).await?;
        self.store.save_pool_version(version).await
    }
}

/// Overlay the remote pools onto the current ones.
///
/// Servers the remote no longer publishes keep their current pool. For each
/// server the first remote key (in key order) that is one of its aliases
/// wins. The first UP id is dropped from the 3-star roster, ids become
/// display names and empty rosters get the filler. A remote pool with
/// impossible rates is ignored and the server keeps its current pool.
pub fn merge_pools(
    current: &BTreeMap<String, Pool>,
    remote: &BTreeMap<String, RawPool>,
    roster: &Roster,
    filler: &str,
) -> BTreeMap<String, Pool> {
    let mut merged = current.clone();
    let mut seen = Vec::new();

    for (key, raw) in remote {
        let Some(server) = canonical_server(key) else {
            continue;
        };
        if seen.contains(&server) {
            continue;
        }
        seen.push(server);

        let mut star3 = raw.star3.clone();
        if let Some(up) = raw.up.first() {
            if let Some(pos) = star3.iter().position(|id| id == up) {
                star3.remove(pos);
            }
        }

        let mut pool = Pool {
            name: server.to_string(),
            up_probability: raw.up_prob,
            s3_probability: raw.s3_prob,
            s2_probability: raw.s2_prob,
            up_roster: ids_to_names(server, &raw.up, roster),
            star3_roster: ids_to_names(server, &star3, roster),
            star2_roster: ids_to_names(server, &raw.star2, roster),
            star1_roster: ids_to_names(server, &raw.star1, roster),
        };
        if let Err(e) = pool.validate() {
            warn!(server, "Remote pool rejected: {}", e);
            continue;
        }
        for tier in pool.fill_empty_rosters(filler) {
            info!(server, tier = ?tier, filler, "Empty roster replaced with filler");
        }
        merged.insert(server.to_string(), pool);
    }

    merged
}

fn ids_to_names(server: &str, ids: &[CharaId], roster: &Roster) -> Vec<String> {
    ids.iter()
        .filter_map(|id| match roster.primary_name(id) {
            Some(name) => Some(name.to_string()),
            None => {
                warn!(server, chara_id = %id, "Unknown character id in remote pool");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::{MockGameDataStorePort, MockPoolSourcePort};
    use crate::application::test_support::sample_data;
    use crate::domain::value_objects::DrawTier;

    fn raw(up: &[&str], star3: &[&str], star2: &[&str], star1: &[&str]) -> RawPool {
        let ids = |ids: &[&str]| ids.iter().map(|id| CharaId::from(*id)).collect();
        RawPool {
            up_prob: 7,
            s3_prob: 30,
            s2_prob: 180,
            up: ids(up),
            star3: ids(star3),
            star2: ids(star2),
            star1: ids(star1),
        }
    }

    fn remote_pools() -> BTreeMap<String, RawPool> {
        let mut remote = BTreeMap::new();
        remote.insert(
            "cn".to_string(),
            raw(&["1701"], &["1701", "1018", "9999"], &["1060"], &["1001"]),
        );
        remote.insert("jp".to_string(), raw(&[], &["1061"], &["1059"], &["1001"]));
        remote.insert("KR".to_string(), raw(&["1018"], &[], &[], &[]));
        remote
    }

    #[test]
    fn test_merge_pools_maps_and_cleans() {
        let data = sample_data();
        let merged = merge_pools(data.pools.pools(), &remote_pools(), &data.roster, "镜华(万圣节)");

        let bl = &merged["BL"];
        assert_eq!(bl.up_roster, vec!["环奈".to_string()]);
        // UP removed from 3-star, unknown id dropped
        assert_eq!(bl.star3_roster, vec!["镜华".to_string()]);
        assert_eq!(bl.s3_probability, 30);

        let jp = &merged["JP"];
        assert_eq!(jp.roster(DrawTier::Up), ["镜华(万圣节)".to_string()]);

        // untouched servers survive, unknown servers are ignored
        assert!(merged.contains_key("E2E"));
        assert!(!merged.contains_key("KR"));
    }

    #[test]
    fn test_remote_pool_with_bad_rates_keeps_current() {
        let data = sample_data();
        let mut remote = remote_pools();
        if let Some(cn) = remote.get_mut("cn") {
            cn.s2_prob = u32::MAX;
        }

        let merged = merge_pools(data.pools.pools(), &remote, &data.roster, "镜华(万圣节)");
        assert_eq!(Some(&merged["BL"]), data.pools.get("BL"));
        assert!(merged.values().all(|pool| pool.validate().is_ok()));
        assert_eq!(merged["JP"].s3_probability, 30);
    }

    fn service(
        source: MockPoolSourcePort,
        store: MockGameDataStorePort,
    ) -> (PoolUpdateService, Arc<GameDataService>) {
        let data = Arc::new(GameDataService::new(sample_data()));
        let service = PoolUpdateService::new(
            data.clone(),
            Arc::new(source),
            Arc::new(store),
            "镜华(万圣节)",
        );
        (service, data)
    }

    #[tokio::test]
    async fn test_same_version_is_not_refetched() {
        let mut source = MockPoolSourcePort::new();
        source
            .expect_fetch_version()
            .returning(|| Ok(PoolVersion::new("20240101")));
        source.expect_fetch_pools().never();

        let (service, _) = service(source, MockGameDataStorePort::new());
        let outcome = service.update_pools(false).await.unwrap();
        assert_eq!(outcome, PoolUpdateOutcome::AlreadyLatest("20240101".to_string()));
    }

    #[tokio::test]
    async fn test_force_update_swaps_and_persists() {
        let mut source = MockPoolSourcePort::new();
        source
            .expect_fetch_version()
            .returning(|| Ok(PoolVersion::new("20240101")));
        source.expect_fetch_pools().returning(|| Ok(remote_pools()));

        let mut store = MockGameDataStorePort::new();
        store
            .expect_backup_pools()
            .times(1)
            .withf(|pools| pools["BL"].star3_roster.len() == 2)
            .returning(|_| Ok(()));
        store.expect_save_pools().times(1).returning(|_| Ok(()));
        store
            .expect_save_pool_version()
            .times(1)
            .withf(|v| v.ver == "20240101")
            .returning(|_| Ok(()));

        let (service, data) = service(source, store);
        let outcome = service.update_pools(true).await.unwrap();
        assert_eq!(outcome, PoolUpdateOutcome::Updated("20240101".to_string()));

        let snapshot = data.snapshot().await;
        assert_eq!(
            snapshot.pools.get("BL").unwrap().star3_roster,
            vec!["镜华".to_string()]
        );
        assert!(snapshot.pools.get("JP").is_some());
    }

    #[tokio::test]
    async fn test_update_with_bad_rates_keeps_previous_pool() {
        let mut source = MockPoolSourcePort::new();
        source
            .expect_fetch_version()
            .returning(|| Ok(PoolVersion::new("20250101")));
        source.expect_fetch_pools().returning(|| {
            let mut remote = remote_pools();
            if let Some(cn) = remote.get_mut("cn") {
                cn.up_prob = 500;
            }
            Ok(remote)
        });

        let mut store = MockGameDataStorePort::new();
        store.expect_backup_pools().returning(|_| Ok(()));
        store
            .expect_save_pools()
            .times(1)
            .withf(|pools| pools.values().all(|pool| pool.validate().is_ok()))
            .returning(|_| Ok(()));
        store.expect_save_pool_version().returning(|_| Ok(()));

        let (service, data) = service(source, store);
        let before = data.snapshot().await.pools.get("BL").cloned();
        service.update_pools(false).await.unwrap();

        let after = data.snapshot().await;
        assert_eq!(after.pools.get("BL").cloned(), before);
        assert_eq!(after.pools.get("JP").map(|jp| jp.s3_probability), Some(30));
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_new_pools_live() {
        let mut source = MockPoolSourcePort::new();
        source
            .expect_fetch_version()
            .returning(|| Ok(PoolVersion::new("20250101")));
        source.expect_fetch_pools().returning(|| Ok(remote_pools()));

        let mut store = MockGameDataStorePort::new();
        store.expect_backup_pools().returning(|_| Ok(()));
        store
            .expect_save_pools()
            .returning(|_| Err(DataStoreError::Io("read-only".to_string())));

        let (service, data) = service(source, store);
        let err = service.update_pools(false).await.unwrap_err();
        assert!(matches!(err, PoolUpdateError::Persist { ref version, .. } if version == "20250101"));
        assert_eq!(data.snapshot().await.pool_version.ver, "20250101");
    }

    #[tokio::test]
    async fn test_source_failure_leaves_data_alone() {
        let mut source = MockPoolSourcePort::new();
        source
            .expect_fetch_version()
            .returning(|| Err(PoolSourceError::Http("timeout".to_string())));

        let (service, data) = service(source, MockGameDataStorePort::new());
        let err = service.update_pools(false).await.unwrap_err();
        assert!(matches!(err, PoolUpdateError::Source(_)));
        assert_eq!(data.snapshot().await.pool_version.ver, "20240101");
    }
}
