//! Domain entities - Core business objects with identity

mod character;
mod draw;
mod fortune;
mod guess_game;
mod pool;
mod roster;

pub use character::Character;
pub use draw::{DrawResult, TenDrawResult, TenjouResult};
pub use fortune::{FortuneData, FortuneSlip, LuckDescription, LuckEntry, LuckType};
pub use guess_game::{GuessGame, GuessVariant, ProfileHint, Question};
pub use pool::{canonical_server, Pool, PoolError, PoolRegistry, RawPool, SERVER_ALIASES};
pub use roster::{NameMatch, Roster};
