//! Skin quiz API.
//!
//! ```text
//! GET  /api/quiz   - Questions
//! POST /api/quiz   - Answers in, up to three recommendations out
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use tracing::instrument;

use super::ApiResponse;
use crate::error::{AppError, add_breadcrumb};
use crate::services::quiz::{self, QuizQuestion};
use crate::services::{QuizAnswers, Recommendation};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuizQuestions {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Serialize)]
pub struct QuizResult {
    pub recommendations: Vec<Recommendation>,
}

/// `GET /api/quiz`
pub async fn questions() -> ApiResponse<QuizQuestions> {
    ApiResponse::ok(QuizQuestions {
        questions: quiz::questions(),
    })
}

/// `POST /api/quiz`
#[instrument(skip(state, answers))]
pub async fn submit(
    State(state): State<AppState>,
    answers: Result<Json<QuizAnswers>, JsonRejection>,
) -> Result<ApiResponse<QuizResult>, AppError> {
    let Json(answers) = answers.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let skin_type = answers.skin_type.map_or("none", |t| t.as_str());
    let concerns = answers.concerns.len().to_string();
    add_breadcrumb(
        "quiz",
        "Quiz submitted",
        &[("skin_type", skin_type), ("concerns", &concerns)],
    );

    let products = state.catalog().snapshot().await?;
    let recommendations = quiz::recommend(&products, &answers);
    tracing::info!(
        skin_type,
        sensitive = answers.sensitive,
        recommended = recommendations.len(),
        "Quiz scored"
    );

    Ok(ApiResponse::ok(QuizResult { recommendations }))
}
