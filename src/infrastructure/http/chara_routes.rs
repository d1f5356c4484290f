//! Character lookup and artwork routes

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::ports::outbound::ImageKind;
use crate::application::services::artwork::resolve_or_placeholder;
use crate::application::services::WhoisResult;
use crate::domain::value_objects::CharaId;
use crate::infrastructure::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WhoisQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ArtworkQuery {
    #[serde(default = "default_star")]
    pub star: u8,
}

fn default_star() -> u8 {
    3
}

/// Resolve a name; weak fuzzy matches are reported as not found
pub async fn whois(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WhoisQuery>,
) -> Result<Json<WhoisResult>, (StatusCode, String)> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".to_string()));
    }

    let result = state.whois_service.whois(name).await;
    if result.score < state.config.guess.match_threshold {
        return Err((
            StatusCode::NOT_FOUND,
            format!("No character matches '{}'", name),
        ));
    }
    Ok(Json(result))
}

pub async fn get_icon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ArtworkQuery>,
) -> impl IntoResponse {
    let png = resolve_or_placeholder(
        state.images.as_ref(),
        ImageKind::Icon,
        &CharaId::from(id),
        query.star,
    )
    .await;
    ([(header::CONTENT_TYPE, "image/png")], png)
}

pub async fn get_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ArtworkQuery>,
) -> impl IntoResponse {
    let png = resolve_or_placeholder(
        state.images.as_ref(),
        ImageKind::Card,
        &CharaId::from(id),
        query.star,
    )
    .await;
    ([(header::CONTENT_TYPE, "image/png")], png)
}
