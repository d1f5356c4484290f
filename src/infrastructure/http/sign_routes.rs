//! Daily sign-in and stamp collection routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::application::services::{Collection, SignCard, SignError, SignOutcome};
use crate::domain::value_objects::{GroupId, UserId};
use crate::infrastructure::state::AppState;

fn sign_error(e: SignError) -> (StatusCode, String) {
    let status = match &e {
        SignError::NoStamps => StatusCode::SERVICE_UNAVAILABLE,
        SignError::Record(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Path((gid, uid)): Path<(String, String)>,
) -> Result<Json<SignCard>, (StatusCode, String)> {
    let outcome = state
        .sign_service
        .sign_in(&GroupId::from(gid), &UserId::from(uid))
        .await
        .map_err(sign_error)?;

    match outcome {
        SignOutcome::Signed(card) => Ok(Json(card)),
        SignOutcome::AlreadySigned => Err((
            StatusCode::CONFLICT,
            "Already signed in today".to_string(),
        )),
    }
}

pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    Path((gid, uid)): Path<(String, String)>,
) -> Result<Json<Collection>, (StatusCode, String)> {
    state
        .sign_service
        .collection(&GroupId::from(gid), &UserId::from(uid))
        .await
        .map(Json)
        .map_err(sign_error)
}
