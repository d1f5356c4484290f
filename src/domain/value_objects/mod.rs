//! Value objects - Immutable objects defined by their attributes

mod ids;
mod text;
mod tier;

pub use ids::*;
pub use text::{normalize_name, similarity_ratio};
pub use tier::{DrawTier, PROBABILITY_SPACE};
