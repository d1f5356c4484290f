//! Guess game API routes

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::services::{GuessError, RoundOutcome, SubmitOutcome};
use crate::domain::entities::{GuessGame, GuessVariant, ProfileHint};
use crate::domain::value_objects::{GroupId, UserId};
use crate::infrastructure::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub uid: String,
    pub text: String,
}

/// A round as seen by players; never carries the answer
#[derive(Debug, Serialize)]
pub struct GuessGameResponse {
    pub round_id: String,
    pub gid: String,
    pub variant: GuessVariant,
    pub started_at: DateTime<Utc>,
    /// Question image at `/api/groups/{gid}/guess/image`
    pub has_image: bool,
    /// Profile hints shown so far, in order
    pub hints: Vec<ProfileHint>,
    pub hint_total: usize,
}

impl From<&GuessGame> for GuessGameResponse {
    fn from(game: &GuessGame) -> Self {
        Self {
            round_id: game.round_id.to_string(),
            gid: game.gid.to_string(),
            variant: game.variant(),
            started_at: game.started_at,
            has_image: game.question.image().is_some(),
            hints: game.revealed_hints().to_vec(),
            hint_total: game.question.hints().len(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AnswerResponse {
    NoActiveGame,
    Wrong {
        /// Closest character name to what was typed
        matched: String,
        score: u8,
    },
    Correct {
        winner: String,
        answer: String,
        chara_id: String,
        wins: Option<u32>,
    },
}

impl From<SubmitOutcome> for AnswerResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::NoActiveGame => Self::NoActiveGame,
            SubmitOutcome::Wrong { matched } => Self::Wrong {
                matched: matched.name,
                score: matched.score,
            },
            SubmitOutcome::Correct { game, wins } => Self::Correct {
                winner: game.winner.map(|w| w.to_string()).unwrap_or_default(),
                answer: game.answer.name,
                chara_id: game.answer.id.to_string(),
                wins,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RankingEntry {
    pub uid: String,
    pub wins: u32,
}

fn guess_error(e: GuessError) -> (StatusCode, String) {
    let status = match &e {
        GuessError::AlreadyPlaying => StatusCode::CONFLICT,
        GuessError::NoCandidates(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GuessError::Image(_) => StatusCode::BAD_GATEWAY,
        GuessError::WinRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn parse_variant(variant: &str) -> Result<GuessVariant, (StatusCode, String)> {
    variant
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))
}

/// Start a round; its timer runs in the background
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path((gid, variant)): Path<(String, String)>,
) -> Result<(StatusCode, Json<GuessGameResponse>), (StatusCode, String)> {
    let variant = parse_variant(&variant)?;
    let game = state
        .guess_service
        .start_round(&GroupId::from(gid), variant)
        .await
        .map_err(guess_error)?;

    Ok((StatusCode::CREATED, Json(GuessGameResponse::from(&game))))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, String)> {
    let outcome = state
        .guess_service
        .submit(&GroupId::from(gid), &UserId::from(req.uid), req.text.trim())
        .await
        .map_err(guess_error)?;

    Ok(Json(AnswerResponse::from(outcome)))
}

pub async fn get_active_game(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<Json<GuessGameResponse>, (StatusCode, String)> {
    state
        .guess_service
        .active_game(&GroupId::from(gid))
        .map(|game| Json(GuessGameResponse::from(&game)))
        .ok_or((StatusCode::NOT_FOUND, "No active guess game".to_string()))
}

/// The answer and winner of the group's most recent finished round
pub async fn get_last_outcome(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<Json<RoundOutcome>, (StatusCode, String)> {
    state
        .guess_service
        .last_outcome(&GroupId::from(gid))
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "No finished guess game".to_string()))
}

/// PNG crop shown to players for image rounds
pub async fn get_question_image(
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let game = state
        .guess_service
        .active_game(&GroupId::from(gid))
        .ok_or((StatusCode::NOT_FOUND, "No active guess game".to_string()))?;
    let png = game
        .question
        .image()
        .map(<[u8]>::to_vec)
        .ok_or((StatusCode::NOT_FOUND, "This round has no image".to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

pub async fn get_ranking(
    State(state): State<Arc<AppState>>,
    Path((gid, variant)): Path<(String, String)>,
) -> Result<Json<Vec<RankingEntry>>, (StatusCode, String)> {
    let variant = parse_variant(&variant)?;
    let ranking = state
        .guess_service
        .ranking(variant, &GroupId::from(gid))
        .await
        .map_err(guess_error)?;

    Ok(Json(
        ranking
            .into_iter()
            .map(|(uid, wins)| RankingEntry {
                uid: uid.to_string(),
                wins,
            })
            .collect(),
    ))
}
