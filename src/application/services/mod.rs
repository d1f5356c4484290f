//! Application services - Use case implementations
//!
//! Each service takes its outbound ports as `Arc<dyn Port>` and reads game
//! data through the shared [`GameDataService`] snapshot.

pub mod artwork;
pub mod fortune_service;
pub mod gacha_service;
pub mod game_data_service;
pub mod guess_service;
pub mod pool_update_service;
pub mod sign_service;
pub mod whois_service;

pub use fortune_service::{DailyLimiter, FortuneError, FortuneService};
pub use gacha_service::{GachaError, GachaService, PoolInfo};
pub use game_data_service::{GameData, GameDataService};
pub use guess_service::{
    GuessError, GuessService, GuessSettings, RoundEvent, RoundOutcome, StartedRound,
    SubmitOutcome,
};
pub use pool_update_service::{PoolUpdateError, PoolUpdateOutcome, PoolUpdateService};
pub use sign_service::{Collection, SignCard, SignError, SignOutcome, SignService};
pub use whois_service::{WhoisResult, WhoisService};
