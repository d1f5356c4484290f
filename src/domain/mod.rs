//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Character, Pool, Roster, GuessGame and draw outcomes
//! - Value Objects: ids, draw tiers, name normalisation

pub mod entities;
pub mod value_objects;
