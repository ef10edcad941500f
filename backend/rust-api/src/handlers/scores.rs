use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::ScoreError,
    models::{HighScoresQuery, SaveScoreRequest},
    services::{score_service::DEFAULT_HIGH_SCORES_DISPLAY, AppState},
};

pub async fn get_high_scores(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HighScoresQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HIGH_SCORES_DISPLAY);
    Json(state.scores.high_scores(limit).await)
}

pub async fn save_score(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveScoreRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Submitting score: name={:?}, score={}", req.name, req.score);

    match state.scores.save_score(&req.name, req.score).await {
        Ok(saved) => Ok((StatusCode::CREATED, Json(saved))),
        Err(ScoreError::Validation(msg)) => {
            tracing::warn!("Rejected score submission: {}", msg);
            Err((StatusCode::BAD_REQUEST, msg))
        }
        Err(e) => {
            tracing::error!("Failed to save score: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
