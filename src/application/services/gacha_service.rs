//! Gacha Service - single pulls, ten-pulls and the 300-pull tenjou run
//!
//! The tier of a pull comes from one uniform pick in `1..=1000` checked
//! against cumulative thresholds (see [`DrawTier::from_pick`]). The tenth pull
//! of every ten-pull widens the 2-star band to `1000 - s3`, so it cannot land
//! on 1-star.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::ports::outbound::{
    GroupPoolError, GroupPoolPort, ImageKind, ImageResolverPort, RandomPort,
};
use crate::application::services::artwork::resolve_or_placeholder;
use crate::application::services::{GameData, GameDataService};
use crate::domain::entities::{DrawResult, Pool, Roster, TenDrawResult, TenjouResult};
use crate::domain::value_objects::{DrawTier, GroupId, PROBABILITY_SPACE};

/// Ten-pull blocks in a tenjou run (300 pulls)
pub const TENJOU_BLOCKS: usize = 30;
const PULLS_PER_BLOCK: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum GachaError {
    #[error("No gacha pools are loaded")]
    NoPools,
    #[error("Unknown pool: {0}")]
    UnknownPool(String),
    #[error(transparent)]
    GroupPool(#[from] GroupPoolError),
}

/// Summary of the pool a group draws from
#[derive(Debug, Clone, Serialize)]
pub struct PoolInfo {
    pub name: String,
    pub up: Vec<String>,
    /// Percent
    pub up_rate: f64,
    /// Percent, UP included
    pub s3_rate: f64,
    pub version: String,
}

/// Pull thresholds, all out of 1000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Thresholds {
    up: u32,
    s3: u32,
    s2: u32,
}

impl Thresholds {
    fn nominal(pool: &Pool) -> Self {
        Self {
            up: pool.up_probability,
            s3: pool.s3_probability,
            s2: pool.s2_probability,
        }
    }

    /// 2-star band absorbs the 1-star band
    fn guaranteed(pool: &Pool) -> Self {
        Self {
            s2: PROBABILITY_SPACE.saturating_sub(pool.s3_probability),
            ..Self::nominal(pool)
        }
    }
}

pub struct GachaService {
    data: Arc<GameDataService>,
    random: Arc<dyn RandomPort>,
    images: Arc<dyn ImageResolverPort>,
    group_pools: Arc<dyn GroupPoolPort>,
    default_pool: String,
    filler: String,
}

impl GachaService {
    pub fn new(
        data: Arc<GameDataService>,
        random: Arc<dyn RandomPort>,
        images: Arc<dyn ImageResolverPort>,
        group_pools: Arc<dyn GroupPoolPort>,
        default_pool: impl Into<String>,
        filler: impl Into<String>,
    ) -> Self {
        Self {
            data,
            random,
            images,
            group_pools,
            default_pool: default_pool.into(),
            filler: filler.into(),
        }
    }

    /// One pull: tier from the thresholds, then a uniform pick inside the tier.
    /// No artwork is resolved here.
    fn pull(&self, pool: &Pool, roster: &Roster, thresholds: Thresholds) -> DrawResult {
        let pick = self.random.pick(1, PROBABILITY_SPACE);
        let tier = DrawTier::from_pick(pick, thresholds.up, thresholds.s3, thresholds.s2);

        let candidates = pool.roster(tier);
        let name = if candidates.is_empty() {
            warn!(pool = %pool.name, tier = ?tier, "Empty roster, handing out filler");
            self.filler.as_str()
        } else {
            candidates[self.random.index(candidates.len())].as_str()
        };

        DrawResult::new(roster.character_by_name(name, tier.stars()), tier)
    }

    async fn attach_icon(&self, mut draw: DrawResult) -> DrawResult {
        let icon = resolve_or_placeholder(
            self.images.as_ref(),
            ImageKind::Icon,
            &draw.character.id,
            draw.character.star,
        )
        .await;
        draw.character.icon = Some(icon);
        draw
    }

    /// Single pull with the pool's nominal rates
    pub async fn draw_one(&self, pool: &Pool, roster: &Roster) -> DrawResult {
        let draw = self.pull(pool, roster, Thresholds::nominal(pool));
        self.attach_icon(draw).await
    }

    /// Nine nominal pulls and a tenth with the 3-star floor
    pub async fn draw_ten(&self, pool: &Pool, roster: &Roster) -> TenDrawResult {
        let mut pulls = Vec::with_capacity(PULLS_PER_BLOCK);
        for _ in 0..PULLS_PER_BLOCK - 1 {
            pulls.push(self.pull(pool, roster, Thresholds::nominal(pool)));
        }
        pulls.push(self.pull(pool, roster, Thresholds::guaranteed(pool)));

        // pulls are drawn in order; artwork can resolve concurrently
        let draws = join_all(pulls.into_iter().map(|draw| self.attach_icon(draw))).await;
        TenDrawResult::new(draws)
    }

    /// Thirty ten-pulls in a row. Only 3-star hits get artwork.
    pub async fn draw_tenjou(&self, pool: &Pool, roster: &Roster) -> TenjouResult {
        let mut result = TenjouResult::new();
        for _ in 0..TENJOU_BLOCKS {
            for slot in 0..PULLS_PER_BLOCK {
                let thresholds = if slot == PULLS_PER_BLOCK - 1 {
                    Thresholds::guaranteed(pool)
                } else {
                    Thresholds::nominal(pool)
                };
                let mut draw = self.pull(pool, roster, thresholds);
                if draw.tier.is_three_star() {
                    draw = self.attach_icon(draw).await;
                }
                result.record(draw);
            }
        }

        debug!(
            pool = %pool.name,
            up_count = result.up_count,
            first_up = result.first_up_position,
            currency = result.currency,
            "Tenjou run finished"
        );
        result
    }

    /// Name of the pool a group draws from. Storage failures fall back to
    /// the default pool rather than failing the draw.
    async fn selected_pool(&self, gid: &GroupId) -> String {
        match self.group_pools.get_pool(gid).await {
            Ok(Some(name)) => name,
            Ok(None) => self.default_pool.clone(),
            Err(e) => {
                warn!(gid = %gid, error = %e, "Could not read group pool, using default");
                self.default_pool.clone()
            }
        }
    }

    /// Snapshot plus the resolved pool name for a group
    pub async fn gacha_for_group(&self, gid: &GroupId) -> Result<(Arc<GameData>, String), GachaError> {
        let data = self.data.snapshot().await;
        let wanted = self.selected_pool(gid).await;
        let pool = data
            .pools
            .get_or_default(&wanted, &self.default_pool)
            .ok_or(GachaError::NoPools)?;
        let name = pool.name.clone();
        Ok((data, name))
    }

    fn pool_in<'a>(data: &'a GameData, name: &str) -> Result<&'a Pool, GachaError> {
        data.pools
            .get(name)
            .ok_or_else(|| GachaError::UnknownPool(name.to_string()))
    }

    #[instrument(skip(self, gid), fields(gid = %gid))]
    pub async fn single(&self, gid: &GroupId) -> Result<DrawResult, GachaError> {
        let (data, name) = self.gacha_for_group(gid).await?;
        let pool = Self::pool_in(&data, &name)?;
        Ok(self.draw_one(pool, &data.roster).await)
    }

    #[instrument(skip(self, gid), fields(gid = %gid))]
    pub async fn ten(&self, gid: &GroupId) -> Result<TenDrawResult, GachaError> {
        let (data, name) = self.gacha_for_group(gid).await?;
        let pool = Self::pool_in(&data, &name)?;
        Ok(self.draw_ten(pool, &data.roster).await)
    }

    #[instrument(skip(self, gid), fields(gid = %gid))]
    pub async fn tenjou(&self, gid: &GroupId) -> Result<TenjouResult, GachaError> {
        let (data, name) = self.gacha_for_group(gid).await?;
        let pool = Self::pool_in(&data, &name)?;
        Ok(self.draw_tenjou(pool, &data.roster).await)
    }

    /// Select the pool a group draws from
    #[instrument(skip(self, gid), fields(gid = %gid))]
    pub async fn set_group_pool(&self, gid: &GroupId, name: &str) -> Result<(), GachaError> {
        let data = self.data.snapshot().await;
        if data.pools.get(name).is_none() {
            return Err(GachaError::UnknownPool(name.to_string()));
        }
        self.group_pools.set_pool(gid, name).await?;
        info!(pool = %name, "Group pool selected");
        Ok(())
    }

    pub async fn list_pools(&self) -> Vec<String> {
        self.data.snapshot().await.pools.names()
    }

    pub async fn pool_info(&self, gid: &GroupId) -> Result<PoolInfo, GachaError> {
        let (data, name) = self.gacha_for_group(gid).await?;
        let pool = Self::pool_in(&data, &name)?;
        Ok(PoolInfo {
            name: pool.name.clone(),
            up: pool.up_roster.clone(),
            up_rate: f64::from(pool.up_probability) / 10.0,
            s3_rate: f64::from(pool.s3_probability) / 10.0,
            version: data.pool_version.ver.clone(),
        })
    }
}
