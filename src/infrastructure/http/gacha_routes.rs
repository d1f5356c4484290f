//! Gacha API routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::services::{GachaError, PoolInfo, PoolUpdateError, PoolUpdateOutcome};
use crate::domain::entities::{DrawResult, TenDrawResult, TenjouResult};
use crate::domain::value_objects::GroupId;
use crate::infrastructure::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectPoolRequest {
    pub pool: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePoolsQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct PoolListResponse {
    pub pools: Vec<String>,
    pub default_pool: String,
    pub version: String,
}

fn gacha_error(e: GachaError) -> (StatusCode, String) {
    let status = match &e {
        GachaError::NoPools => StatusCode::SERVICE_UNAVAILABLE,
        GachaError::UnknownPool(_) => StatusCode::NOT_FOUND,
        GachaError::GroupPool(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// One pull
pub async fn single_draw(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<Json<DrawResult>, (StatusCode, String)> {
    state
        .gacha_service
        .single(&GroupId::from(gid))
        .await
        .map(Json)
        .map_err(gacha_error)
}

/// Ten pulls, the last one 2-star or better
pub async fn ten_draw(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<Json<TenDrawResult>, (StatusCode, String)> {
    state
        .gacha_service
        .ten(&GroupId::from(gid))
        .await
        .map(Json)
        .map_err(gacha_error)
}

/// A full pity ceiling worth of pulls
pub async fn tenjou_draw(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<Json<TenjouResult>, (StatusCode, String)> {
    state
        .gacha_service
        .tenjou(&GroupId::from(gid))
        .await
        .map(Json)
        .map_err(gacha_error)
}

pub async fn get_group_pool(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<Json<PoolInfo>, (StatusCode, String)> {
    state
        .gacha_service
        .pool_info(&GroupId::from(gid))
        .await
        .map(Json)
        .map_err(gacha_error)
}

pub async fn select_group_pool(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
    Json(req): Json<SelectPoolRequest>,
) -> Result<Json<PoolInfo>, (StatusCode, String)> {
    let gid = GroupId::from(gid);
    state
        .gacha_service
        .set_group_pool(&gid, req.pool.trim())
        .await
        .map_err(gacha_error)?;

    state
        .gacha_service
        .pool_info(&gid)
        .await
        .map(Json)
        .map_err(gacha_error)
}

pub async fn list_pools(State(state): State<Arc<AppState>>) -> Json<PoolListResponse> {
    let version = state.game_data.snapshot().await.pool_version.ver.clone();
    Json(PoolListResponse {
        pools: state.gacha_service.list_pools().await,
        default_pool: state.config.default_pool.clone(),
        version,
    })
}

/// Refresh pools from the publisher
pub async fn update_pools(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdatePoolsQuery>,
) -> Result<Json<PoolUpdateOutcome>, (StatusCode, String)> {
    state
        .pool_update_service
        .update_pools(query.force)
        .await
        .map(Json)
        .map_err(|e| {
            let status = match &e {
                PoolUpdateError::Source(_) => StatusCode::BAD_GATEWAY,
                PoolUpdateError::Persist { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })
}
