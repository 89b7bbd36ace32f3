use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::{DailyLog, DailyLogQuery};
use crate::AppState;

pub async fn list_daily_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<DailyLogQuery>, QueryRejection>,
) -> AppResult<Json<Vec<DailyLog>>> {
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    if start > end {
        return Err(AppError::InvalidInput(
            "startDate must not be after endDate".into(),
        ));
    }

    let logs = state
        .store
        .list_daily_logs(&auth_user.id, start, end)
        .await?;

    Ok(Json(logs))
}
