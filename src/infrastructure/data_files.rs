//! JSON data files on disk
//!
//! `{data_dir}/chara_name.json`, `chara_profile.json`, `local_pool.json`,
//! `local_pool_backup.json`, `local_pool_ver.json`, plus the fortune tables
//! under `{resources_dir}/portune/`. A missing file reads as empty; a file
//! that exists but does not parse is an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::application::ports::outbound::{
    CharaNames, CharaProfiles, DataStoreError, GameDataStorePort, PoolVersion,
};
use crate::domain::entities::{FortuneData, LuckDescription, LuckType, Pool};
use crate::domain::value_objects::CharaId;

const NAMES_FILE: &str = "chara_name.json";
const PROFILES_FILE: &str = "chara_profile.json";
const POOLS_FILE: &str = "local_pool.json";
const POOLS_BACKUP_FILE: &str = "local_pool_backup.json";
const POOL_VERSION_FILE: &str = "local_pool_ver.json";

pub struct JsonDataStore {
    dir: PathBuf,
}

impl JsonDataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DataStoreError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Data file not found");
            return Ok(None);
        }
        Err(e) => return Err(DataStoreError::Io(format!("{}: {}", path.display(), e))),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| DataStoreError::Serialization(format!("{}: {}", path.display(), e)))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DataStoreError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| DataStoreError::Serialization(e.to_string()))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DataStoreError::Io(e.to_string()))?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|e| DataStoreError::Io(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), "Wrote data file");
    Ok(())
}

#[async_trait]
impl GameDataStorePort for JsonDataStore {
    async fn load_names(&self) -> Result<CharaNames, DataStoreError> {
        Ok(read_json(&self.path(NAMES_FILE)).await?.unwrap_or_default())
    }

    /// Profile values are mostly strings; anything else is kept as its JSON text
    async fn load_profiles(&self) -> Result<CharaProfiles, DataStoreError> {
        let raw: BTreeMap<CharaId, BTreeMap<String, serde_json::Value>> =
            read_json(&self.path(PROFILES_FILE)).await?.unwrap_or_default();
        Ok(raw
            .into_iter()
            .map(|(id, fields)| {
                let fields = fields
                    .into_iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(s) => (key, s),
                        other => (key, other.to_string()),
                    })
                    .collect();
                (id, fields)
            })
            .collect())
    }

    async fn load_pools(&self) -> Result<BTreeMap<String, Pool>, DataStoreError> {
        Ok(read_json(&self.path(POOLS_FILE)).await?.unwrap_or_default())
    }

    async fn load_pool_version(&self) -> Result<PoolVersion, DataStoreError> {
        Ok(read_json(&self.path(POOL_VERSION_FILE))
            .await?
            .unwrap_or_default())
    }

    async fn save_pools(&self, pools: &BTreeMap<String, Pool>) -> Result<(), DataStoreError> {
        write_json(&self.path(POOLS_FILE), pools).await
    }

    async fn backup_pools(&self, pools: &BTreeMap<String, Pool>) -> Result<(), DataStoreError> {
        write_json(&self.path(POOLS_BACKUP_FILE), pools).await
    }

    async fn save_pool_version(&self, version: &PoolVersion) -> Result<(), DataStoreError> {
        write_json(&self.path(POOL_VERSION_FILE), version).await
    }
}

/// Load `luck_desc.json` and `luck_type.json` from `dir`; both are required
pub async fn load_fortune_data(dir: &Path) -> Result<FortuneData, DataStoreError> {
    let missing = |file: &str| DataStoreError::Io(format!("{} not found", dir.join(file).display()));

    let descriptions: Vec<LuckDescription> = read_json(&dir.join("luck_desc.json"))
        .await?
        .ok_or_else(|| missing("luck_desc.json"))?;
    let types: Vec<LuckType> = read_json(&dir.join("luck_type.json"))
        .await?
        .ok_or_else(|| missing("luck_type.json"))?;

    info!(
        descriptions = descriptions.len(),
        types = types.len(),
        "Loaded fortune data"
    );
    Ok(FortuneData::new(descriptions, types))
}
