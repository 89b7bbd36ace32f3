//! Request/response DTOs for the journaling API.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Response` → serialized to client JSON
//! - Field names on the wire are camelCase, matching the mobile client
//! - Length limits are expressed via `validator` derive macros; presence
//!   checks that need a precise error message happen in the services

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::llm::ChatMessage;
use crate::models::daily_log::InputType;
use crate::models::reflection::ReflectionStep;

pub const MAX_MESSAGE_CHARS: u64 = 4000;
pub const MAX_HISTORY_TURNS: u64 = 50;

// ============================================================================
// Common
// ============================================================================

/// Stable error envelope: every error response uses this shape
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ============================================================================
// Daily log chat
// ============================================================================

/// Explicit conversation-mode hint sent by the client UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    DailyLog,
    WeeklyReflection,
}

/// Where a weekly reflection conversation stands. Returned with every
/// reflection reply and echoed back by the client on the next turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionState {
    pub step: ReflectionStep,
    pub week_start: NaiveDate,
}

/// POST /dailyLogChat
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogChatRequest {
    #[serde(default)]
    #[validate(length(max = 4000, message = "message must be at most 4000 characters"))]
    pub message: Option<String>,

    #[serde(default)]
    #[validate(length(max = 256, message = "userId too long"))]
    pub user_id: Option<String>,

    /// Prior turns, oldest first. Empty on the first turn of a session.
    #[serde(default)]
    #[validate(length(max = 50, message = "conversationHistory has too many turns"))]
    pub conversation_history: Vec<ChatMessage>,

    #[serde(default)]
    pub input_type: InputType,

    #[serde(default)]
    pub intent: Option<ChatIntent>,

    #[serde(default)]
    pub reflection: Option<ReflectionState>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyLogChatResponse {
    pub reply: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<ReflectionState>,
}

// ============================================================================
// Weekly cards
// ============================================================================

/// POST /weeklyCards
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCardsRequest {
    #[serde(default)]
    pub user_id: Option<String>,

    /// Any date in the target week; defaults to the current week.
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_chat_request_minimal() {
        let json = r#"{"message":"hello","userId":"u-1"}"#;
        let req: DailyLogChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.message.as_deref(), Some("hello"));
        assert_eq!(req.user_id.as_deref(), Some("u-1"));
        assert!(req.conversation_history.is_empty());
        assert_eq!(req.input_type, InputType::Chat);
        assert!(req.reflection.is_none());
    }

    #[test]
    fn test_chat_request_full() {
        let json = r#"{
            "message": "fine",
            "userId": "u-1",
            "conversationHistory": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hey"}
            ],
            "inputType": "voice",
            "intent": "weekly_reflection",
            "reflection": {"step": "ASK_WINS", "weekStart": "2024-06-17"}
        }"#;
        let req: DailyLogChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.conversation_history[1].role, Role::Assistant);
        assert_eq!(req.input_type, InputType::Voice);
        assert_eq!(req.intent, Some(ChatIntent::WeeklyReflection));
        assert_eq!(req.reflection.unwrap().step, ReflectionStep::AskWins);
    }

    #[test]
    fn test_chat_request_rejects_unknown_role() {
        let json = r#"{"message":"x","userId":"u","conversationHistory":[{"role":"system","content":"x"}]}"#;
        assert!(serde_json::from_str::<DailyLogChatRequest>(json).is_err());
    }

    #[test]
    fn test_message_length_validated() {
        let req = DailyLogChatRequest {
            message: Some("a".repeat(MAX_MESSAGE_CHARS as usize + 1)),
            user_id: Some("u".into()),
            conversation_history: vec![],
            input_type: InputType::Chat,
            intent: None,
            reflection: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_history_turn_count_validated() {
        let req = DailyLogChatRequest {
            message: Some("hi".into()),
            user_id: Some("u".into()),
            conversation_history: vec![ChatMessage::user("x"); MAX_HISTORY_TURNS as usize + 1],
            input_type: InputType::Chat,
            intent: None,
            reflection: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_response_omits_absent_reflection() {
        let resp = DailyLogChatResponse { reply: "ok".into(), reflection: None };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["reply"], "ok");
        assert!(json.get("reflection").is_none());
    }

    #[test]
    fn test_error_response_omits_absent_details() {
        let resp = ErrorResponse { error: "bad".into(), code: "invalid_input".into(), details: None };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("details").is_none());
    }
}
