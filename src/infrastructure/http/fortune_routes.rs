//! Daily fortune route

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::application::services::FortuneError;
use crate::domain::entities::FortuneSlip;
use crate::domain::value_objects::UserId;
use crate::infrastructure::state::AppState;

pub async fn draw_fortune(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<FortuneSlip>, (StatusCode, String)> {
    state
        .fortune_service
        .draw(&UserId::from(uid))
        .map(Json)
        .map_err(|e| {
            let status = match &e {
                FortuneError::LimitReached(_) => StatusCode::TOO_MANY_REQUESTS,
                FortuneError::MissingDescription(_) | FortuneError::MissingLuckType(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, e.to_string())
        })
}
