use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::RawPool;

#[derive(Debug, thiserror::Error)]
pub enum PoolSourceError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Unexpected payload: {0}")]
    Payload(String),
}

/// Published pool version, `{"ver": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolVersion {
    pub ver: String,
}

impl PoolVersion {
    pub fn new(ver: impl Into<String>) -> Self {
        Self { ver: ver.into() }
    }

    /// Versions are published as integer strings; anything else sorts first
    pub fn number(&self) -> u64 {
        self.ver.trim().parse().unwrap_or(0)
    }
}

impl Default for PoolVersion {
    fn default() -> Self {
        Self::new("0")
    }
}

/// Remote publisher of gacha pools
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolSourcePort: Send + Sync {
    async fn fetch_version(&self) -> Result<PoolVersion, PoolSourceError>;
    async fn fetch_pools(&self) -> Result<BTreeMap<String, RawPool>, PoolSourceError>;
}
