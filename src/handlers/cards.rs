use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::dto::GenerateCardsRequest;
use crate::error::{AppError, AppResult};
use crate::models::cards::{WeeklyCards, WeeklyCardsQuery};
use crate::models::daily_log::week_start;
use crate::services::cards;
use crate::AppState;

pub async fn generate_weekly_cards(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<GenerateCardsRequest>, JsonRejection>,
) -> AppResult<Json<WeeklyCards>> {
    let Json(body) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let user_id = body
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("userId is required".into()))?;
    if user_id != auth_user.id {
        return Err(AppError::Forbidden);
    }

    let week = week_start(body.week_start.unwrap_or_else(|| Utc::now().date_naive()));
    let cards = cards::generate(&state, user_id, week).await?;
    Ok(Json(cards))
}

pub async fn get_weekly_cards(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<WeeklyCardsQuery>, QueryRejection>,
) -> AppResult<Json<WeeklyCards>> {
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let week = week_start(query.week_start.unwrap_or_else(|| Utc::now().date_naive()));

    let cards = state
        .store
        .get_cards(&auth_user.id, week)
        .await?
        .ok_or(AppError::NotFound("No cards for this week".into()))?;

    Ok(Json(cards))
}
