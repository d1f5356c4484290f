//! Outbound ports - Interfaces that the application requires from external systems

mod data_store_port;
mod group_pool_port;
mod image_port;
mod pool_source_port;
mod random_port;
mod sign_record_port;
mod win_record_port;

pub use data_store_port::{CharaNames, CharaProfiles, DataStoreError, GameDataStorePort};
pub use group_pool_port::{GroupPoolError, GroupPoolPort};
pub use image_port::{ImageError, ImageKind, ImageResolverPort};
pub use pool_source_port::{PoolSourceError, PoolSourcePort, PoolVersion};
pub use random_port::RandomPort;
pub use sign_record_port::{SignRecordError, SignRecordPort};
pub use win_record_port::{WinRecordError, WinRecordPort};

#[cfg(test)]
pub use data_store_port::MockGameDataStorePort;
#[cfg(test)]
pub use group_pool_port::MockGroupPoolPort;
#[cfg(test)]
pub use image_port::MockImageResolverPort;
#[cfg(test)]
pub use pool_source_port::MockPoolSourcePort;
#[cfg(test)]
pub use sign_record_port::MockSignRecordPort;
#[cfg(test)]
pub use win_record_port::MockWinRecordPort;
