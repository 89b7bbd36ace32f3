use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::dto::{DailyLogChatRequest, DailyLogChatResponse};
use crate::error::{AppError, AppResult};
use crate::services::chat;
use crate::AppState;

pub async fn daily_log_chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<DailyLogChatRequest>, JsonRejection>,
) -> AppResult<Json<DailyLogChatResponse>> {
    let Json(body) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let today = Utc::now().date_naive();

    let response = chat::handle(&state, &auth_user, body, today).await?;
    Ok(Json(response))
}
