//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Persistence: SQLite win records and per-group pool choice
//! - Data files: JSON cache of names, profiles and pools
//! - Remote: pool publisher and artwork mirror clients
//! - HTTP: REST API routes and the round event WebSocket
//! - Config: Application configuration
//! - State: Shared application state
//! - Workers: round event logging and the daily pool refresh

pub mod config;
pub mod data_files;
pub mod http;
pub mod image_resolver;
pub mod persistence;
pub mod random;
pub mod remote;
pub mod round_events;
pub mod state;
pub mod update_scheduler;
pub mod websocket;
