//! HTTP client for the published gacha pools

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::application::ports::outbound::{PoolSourceError, PoolSourcePort, PoolVersion};
use crate::domain::entities::RawPool;

/// Client for the pool publisher
pub struct RemotePoolClient {
    client: Client,
    pool_url: String,
    version_url: String,
}

impl RemotePoolClient {
    pub fn new(
        pool_url: &str,
        version_url: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            pool_url: pool_url.to_string(),
            version_url: version_url.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(RemoteError::ApiError(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Payload(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid payload: {0}")]
    Payload(String),
}

impl From<RemoteError> for PoolSourceError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Payload(msg) => PoolSourceError::Payload(msg),
            other => PoolSourceError::Http(other.to_string()),
        }
    }
}

/// Keep the entries that look like pools; the publisher mixes in other keys
pub fn parse_pools(document: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, RawPool> {
    document
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<RawPool>(value) {
            Ok(pool) => Some((key, pool)),
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping malformed remote pool entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl PoolSourcePort for RemotePoolClient {
    async fn fetch_version(&self) -> Result<PoolVersion, PoolSourceError> {
        let version: PoolVersion = self.get_json(&self.version_url).await?;
        info!(version = %version.ver, "Fetched remote pool version");
        Ok(version)
    }

    async fn fetch_pools(&self) -> Result<BTreeMap<String, RawPool>, PoolSourceError> {
        info!(url = %self.pool_url, "Fetching remote pools");
        let document: BTreeMap<String, serde_json::Value> = self.get_json(&self.pool_url).await?;
        let pools = parse_pools(document);
        if pools.is_empty() {
            return Err(PoolSourceError::Payload("no pools in document".to_string()));
        }
        Ok(pools)
    }
}
