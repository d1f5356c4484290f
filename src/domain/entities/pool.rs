//! Gacha pool entity and the per-server pool registry

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::value_objects::{CharaId, DrawTier, PROBABILITY_SPACE};

/// Server keys we keep pools for, with the keys the remote source may use for them
pub const SERVER_ALIASES: &[(&str, &[&str])] = &[
    ("BL", &["BL", "bl", "Bl", "bL", "CN", "cn"]),
    ("TW", &["TW", "tw", "so-net", "sonet"]),
    ("JP", &["JP", "jp"]),
    ("MIX", &["MIX", "mix", "Mix", "All", "all", "ALL"]),
];

/// Canonical server key for a remote pool key, if we track that server
pub fn canonical_server(key: &str) -> Option<&'static str> {
    SERVER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key))
        .map(|(server, _)| *server)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool {pool}: rates must satisfy up <= s3 <= s3 + s2 <= 1000 (got up={up}, s3={s3}, s2={s2})")]
    InvalidRates { pool: String, up: u32, s3: u32, s2: u32 },
}

/// One server's gacha configuration
///
/// Rates are integers out of 1000. The 1-star rate is implicit:
/// `1000 - s2 - s3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "up_prob")]
    pub up_probability: u32,
    #[serde(rename = "s3_prob")]
    pub s3_probability: u32,
    #[serde(rename = "s2_prob")]
    pub s2_probability: u32,
    #[serde(rename = "up", default)]
    pub up_roster: Vec<String>,
    #[serde(rename = "star3", default)]
    pub star3_roster: Vec<String>,
    #[serde(rename = "star2", default)]
    pub star2_roster: Vec<String>,
    #[serde(rename = "star1", default)]
    pub star1_roster: Vec<String>,
}

impl Pool {
    pub fn s1_probability(&self) -> u32 {
        PROBABILITY_SPACE.saturating_sub(self.s2_probability.saturating_add(self.s3_probability))
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        let (up, s3, s2) = (self.up_probability, self.s3_probability, self.s2_probability);
        let within_space = s3
            .checked_add(s2)
            .is_some_and(|total| total <= PROBABILITY_SPACE);
        if up <= s3 && within_space {
            Ok(())
        } else {
            Err(PoolError::InvalidRates {
                pool: self.name.clone(),
                up,
                s3,
                s2,
            })
        }
    }

    /// Replace every empty roster with a single filler entry so that every
    /// reachable tier always has someone to hand out.
    ///
    /// Returns the tiers that were filled.
    pub fn fill_empty_rosters(&mut self, filler: &str) -> Vec<DrawTier> {
        let mut filled = Vec::new();
        for tier in [DrawTier::Up, DrawTier::Star3, DrawTier::Star2, DrawTier::Star1] {
            let roster = self.roster_mut(tier);
            if roster.is_empty() {
                roster.push(filler.to_string());
                filled.push(tier);
            }
        }
        filled
    }

    pub fn roster(&self, tier: DrawTier) -> &[String] {
        match tier {
            DrawTier::Up => &self.up_roster,
            DrawTier::Star3 => &self.star3_roster,
            DrawTier::Star2 => &self.star2_roster,
            DrawTier::Star1 => &self.star1_roster,
        }
    }

    fn roster_mut(&mut self, tier: DrawTier) -> &mut Vec<String> {
        match tier {
            DrawTier::Up => &mut self.up_roster,
            DrawTier::Star3 => &mut self.star3_roster,
            DrawTier::Star2 => &mut self.star2_roster,
            DrawTier::Star1 => &mut self.star1_roster,
        }
    }
}

/// Pool entry as published by the remote source: rosters carry ids, not names
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPool {
    pub up_prob: u32,
    pub s3_prob: u32,
    pub s2_prob: u32,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub up: Vec<CharaId>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub star3: Vec<CharaId>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub star2: Vec<CharaId>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub star1: Vec<CharaId>,
}

/// The remote source mixes integer and string ids
fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<CharaId>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Number(n) => Ok(CharaId::new(n.to_string())),
            serde_json::Value::String(s) => Ok(CharaId::new(s)),
            other => Err(serde::de::Error::custom(format!(
                "invalid character id: {}",
                other
            ))),
        })
        .collect()
}

/// All known pools keyed by server, with a fallback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolRegistry {
    pools: BTreeMap<String, Pool>,
}

impl PoolRegistry {
    pub fn new(pools: BTreeMap<String, Pool>) -> Self {
        let pools = pools
            .into_iter()
            .map(|(name, mut pool)| {
                pool.name = name.clone();
                (name, pool)
            })
            .collect();
        Self { pools }
    }

    /// Registry of the pools whose rates hold up; the rest come back as errors
    pub fn validated(pools: BTreeMap<String, Pool>) -> (Self, Vec<PoolError>) {
        let mut rejected = Vec::new();
        let registry = Self::new(pools);
        let pools = registry
            .pools
            .into_iter()
            .filter(|(_, pool)| match pool.validate() {
                Ok(()) => true,
                Err(e) => {
                    rejected.push(e);
                    false
                }
            })
            .collect();
        (Self { pools }, rejected)
    }

    pub fn get(&self, name: &str) -> Option<&Pool> {
        self.pools.get(name)
    }

    /// The named pool, else the default pool, else any pool at all
    pub fn get_or_default(&self, name: &str, default: &str) -> Option<&Pool> {
        self.pools
            .get(name)
            .or_else(|| self.pools.get(default))
            .or_else(|| self.pools.values().next())
    }

    pub fn names(&self) -> Vec<String> {
        self.pools.keys().cloned().collect()
    }

    pub fn pools(&self) -> &BTreeMap<String, Pool> {
        &self.pools
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }
}
