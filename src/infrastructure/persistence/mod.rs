//! Persistence layer - SQLite repositories
//!
//! Win records, per-group pool choices and sign-in records live in a
//! single SQLite file.

mod group_pool_repository;
mod sign_record_repository;
mod win_record_repository;

pub use group_pool_repository::SqliteGroupPoolRepository;
pub use sign_record_repository::SqliteSignRecordRepository;
pub use win_record_repository::SqliteWinRecordRepository;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

/// Open (and create if missing) the SQLite database at `database_url`
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true);

    // Ensure data directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let pool = SqlitePool::connect_with(options)
        .await
        .context("Failed to connect to SQLite database")?;
    tracing::info!("Connected to SQLite database: {}", database_url);
    Ok(pool)
}
