//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::outbound::{GameDataStorePort, ImageResolverPort, RandomPort};
use crate::application::services::fortune_service::utc_offset_hours;
use crate::application::services::{
    DailyLimiter, FortuneService, GachaService, GameDataService, GuessService, PoolUpdateService,
    SignService, WhoisService,
};
use crate::domain::entities::FortuneData;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::data_files::{load_fortune_data, JsonDataStore};
use crate::infrastructure::image_resolver::CachedImageResolver;
use crate::infrastructure::persistence::{
    self, SqliteGroupPoolRepository, SqliteSignRecordRepository, SqliteWinRecordRepository,
};
use crate::infrastructure::random::ThreadRandom;
use crate::infrastructure::remote::RemotePoolClient;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub game_data: Arc<GameDataService>,
    pub images: Arc<dyn ImageResolverPort>,
    // Application services
    pub gacha_service: GachaService,
    pub guess_service: Arc<GuessService>,
    pub pool_update_service: Arc<PoolUpdateService>,
    pub whois_service: WhoisService,
    pub fortune_service: FortuneService,
    pub sign_service: SignService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        // Local data cache
        let store: Arc<dyn GameDataStorePort> = Arc::new(JsonDataStore::new(config.data_dir.clone()));
        let game_data = Arc::new(
            GameDataService::load(store.as_ref())
                .await
                .context("Failed to load game data")?,
        );

        // SQLite repositories
        let pool = persistence::connect(&config.database_url).await?;
        let win_records = Arc::new(
            SqliteWinRecordRepository::new(pool.clone())
                .await
                .context("Failed to prepare win record table")?,
        );
        let group_pools = Arc::new(
            SqliteGroupPoolRepository::new(pool.clone())
                .await
                .context("Failed to prepare group pool table")?,
        );
        let sign_records = Arc::new(
            SqliteSignRecordRepository::new(pool)
                .await
                .context("Failed to prepare sign-in tables")?,
        );

        // Remote sources
        let images: Arc<dyn ImageResolverPort> = Arc::new(
            CachedImageResolver::new(&config.image_base_url, config.image_cache_dir(), timeout)
                .context("Failed to build image client")?,
        );
        let pool_source = Arc::new(
            RemotePoolClient::new(&config.pool_url, &config.pool_version_url, timeout)
                .context("Failed to build pool client")?,
        );

        let random: Arc<dyn RandomPort> = Arc::new(ThreadRandom);

        // Application services
        let gacha_service = GachaService::new(
            game_data.clone(),
            random.clone(),
            images.clone(),
            group_pools,
            config.default_pool.clone(),
            config.filler_character.clone(),
        );
        let guess_service = Arc::new(GuessService::new(
            game_data.clone(),
            random.clone(),
            images.clone(),
            win_records,
            config.guess.to_settings(),
        ));
        let pool_update_service = Arc::new(PoolUpdateService::new(
            game_data.clone(),
            pool_source,
            store,
            config.filler_character.clone(),
        ));
        let whois_service = WhoisService::new(game_data.clone(), images.clone());

        let fortune_data = match load_fortune_data(&config.fortune_dir()).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Fortune data unavailable, fortune slips disabled: {}", e);
                FortuneData::default()
            }
        };
        let sign_service = SignService::new(
            game_data.clone(),
            random.clone(),
            sign_records,
            utc_offset_hours(config.sign.utc_offset_hours),
        );
        let fortune_service = FortuneService::new(
            fortune_data,
            random,
            DailyLimiter::with_utc_offset_hours(
                config.fortune.daily_limit,
                config.fortune.utc_offset_hours,
            ),
        );

        Ok(Self {
            config,
            game_data,
            images,
            gacha_service,
            guess_service,
            pool_update_service,
            whois_service,
            fortune_service,
            sign_service,
        })
    }
}
