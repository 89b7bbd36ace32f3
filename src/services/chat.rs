//! Entry point for `POST /dailyLogChat`: validates the turn, then routes it
//! to the weekly reflection flow or to daily-log extraction.

use chrono::NaiveDate;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{DailyLogChatRequest, DailyLogChatResponse, MAX_MESSAGE_CHARS};
use crate::error::{AppError, AppResult};
use crate::llm::ChatMessage;
use crate::models::daily_log::InputType;
use crate::services::{extraction, intent, reflection};
use crate::AppState;

/// A request that passed validation.
#[derive(Debug)]
pub struct ChatTurn {
    pub user_id: String,
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub input_type: InputType,
    pub request: DailyLogChatRequest,
}

/// Checks everything that can be checked without side effects.
pub fn validate(auth_user: &AuthUser, mut body: DailyLogChatRequest) -> AppResult<ChatTurn> {
    let message = body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::InvalidInput("message is required".into()))?
        .to_string();

    let user_id = body
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("userId is required".into()))?
        .to_string();

    body.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    if let Some(turn) = body
        .conversation_history
        .iter()
        .position(|t| t.content.chars().count() as u64 > MAX_MESSAGE_CHARS)
    {
        return Err(AppError::InvalidInput(format!(
            "conversationHistory[{turn}] exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }

    if user_id != auth_user.id {
        tracing::warn!(token_user = %auth_user.id, body_user = %user_id, "userId does not match token");
        return Err(AppError::Forbidden);
    }

    let history = std::mem::take(&mut body.conversation_history);
    Ok(ChatTurn {
        user_id,
        message,
        history,
        input_type: body.input_type,
        request: body,
    })
}

pub async fn handle(
    state: &AppState,
    auth_user: &AuthUser,
    body: DailyLogChatRequest,
    today: NaiveDate,
) -> AppResult<DailyLogChatResponse> {
    let turn = validate(auth_user, body)?;

    if let Some(current) = turn.request.reflection.filter(|r| !r.step.is_terminal()) {
        let next = reflection::advance(state, &turn.user_id, current, &turn.message).await?;
        return Ok(DailyLogChatResponse { reply: next.reply, reflection: Some(next.state) });
    }

    if intent::wants_weekly_reflection(&turn.message, turn.request.intent) {
        tracing::info!(user_id = %turn.user_id, "Starting weekly reflection");
        let first = reflection::start(today);
        return Ok(DailyLogChatResponse { reply: first.reply, reflection: Some(first.state) });
    }

    let reply = extraction::log_turn(
        state,
        &turn.user_id,
        &turn.message,
        &turn.history,
        turn.input_type,
        today,
    )
    .await?;

    Ok(DailyLogChatResponse { reply, reflection: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(id: &str) -> AuthUser {
        AuthUser { id: id.to_string() }
    }

    fn body(message: Option<&str>, user_id: Option<&str>) -> DailyLogChatRequest {
        DailyLogChatRequest {
            message: message.map(String::from),
            user_id: user_id.map(String::from),
            conversation_history: vec![],
            input_type: InputType::Chat,
            intent: None,
            reflection: None,
        }
    }

    #[test]
    fn test_empty_and_blank_message_rejected() {
        for msg in [None, Some(""), Some("   \n\t")] {
            let err = validate(&auth("u"), body(msg, Some("u"))).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{msg:?}");
        }
    }

    #[test]
    fn test_missing_user_id_rejected() {
        let err = validate(&auth("u"), body(Some("hi"), None)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(m) if m.contains("userId")));
    }

    #[test]
    fn test_mismatched_user_forbidden() {
        let err = validate(&auth("u"), body(Some("hi"), Some("someone-else"))).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn test_oversized_history_turn_rejected() {
        let mut req = body(Some("hi"), Some("u"));
        req.conversation_history = vec![ChatMessage::user("x".repeat(MAX_MESSAGE_CHARS as usize + 1))];
        let err = validate(&auth("u"), req).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(m) if m.contains("conversationHistory[0]")));
    }

    #[test]
    fn test_valid_turn_is_trimmed() {
        let turn = validate(&auth("u"), body(Some("  good day  "), Some("u"))).unwrap();
        assert_eq!(turn.message, "good day");
        assert_eq!(turn.user_id, "u");
    }
}
