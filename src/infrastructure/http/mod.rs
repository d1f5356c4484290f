//! HTTP REST API routes

mod chara_routes;
mod fortune_routes;
mod gacha_routes;
mod guess_routes;
mod sign_routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::infrastructure::state::AppState;
use crate::infrastructure::websocket;

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Gacha routes
        .route(
            "/api/groups/{gid}/gacha/single",
            post(gacha_routes::single_draw),
        )
        .route("/api/groups/{gid}/gacha/ten", post(gacha_routes::ten_draw))
        .route(
            "/api/groups/{gid}/gacha/tenjou",
            post(gacha_routes::tenjou_draw),
        )
        .route(
            "/api/groups/{gid}/pool",
            get(gacha_routes::get_group_pool).put(gacha_routes::select_group_pool),
        )
        .route("/api/pools", get(gacha_routes::list_pools))
        .route("/api/pools/update", post(gacha_routes::update_pools))
        // Guess routes
        .route("/api/groups/{gid}/guess", get(guess_routes::get_active_game))
        .route(
            "/api/groups/{gid}/guess/answer",
            post(guess_routes::submit_answer),
        )
        .route(
            "/api/groups/{gid}/guess/image",
            get(guess_routes::get_question_image),
        )
        .route(
            "/api/groups/{gid}/guess/last",
            get(guess_routes::get_last_outcome),
        )
        .route(
            "/api/groups/{gid}/guess/events",
            get(websocket::round_events_handler),
        )
        .route(
            "/api/groups/{gid}/guess/{variant}",
            post(guess_routes::start_game),
        )
        .route(
            "/api/groups/{gid}/guess/{variant}/ranking",
            get(guess_routes::get_ranking),
        )
        // Character routes
        .route("/api/whois", get(chara_routes::whois))
        .route("/api/charas/{id}/icon", get(chara_routes::get_icon))
        .route("/api/charas/{id}/card", get(chara_routes::get_card))
        // Fortune routes
        .route(
            "/api/users/{uid}/fortune",
            post(fortune_routes::draw_fortune),
        )
        // Sign-in routes
        .route(
            "/api/groups/{gid}/users/{uid}/sign",
            post(sign_routes::sign_in),
        )
        .route(
            "/api/groups/{gid}/users/{uid}/collection",
            get(sign_routes::get_collection),
        )
}
