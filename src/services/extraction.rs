//! Daily-log extraction: one user turn in, one reply and one merged
//! `daily_logs` row out.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::llm::{complete_with_timeout, ChatMessage, ModelReply, ModelRequest, ToolSpec};
use crate::models::daily_log::{score_in_range, InputType, LogDelta, LogWrite};
use crate::services::fallback;
use crate::AppState;

pub const SOURCE_AGENT: &str = "daily_log_chat";
pub const RECORD_TOOL_NAME: &str = "record_daily_log";
/// Tool field carrying the conversational reply, used when the model
/// answers with a tool call and no text block.
pub const REPLY_FIELD: &str = "reply";

const PERSONA: &str = "You are a warm, curious journaling companion helping the user check in \
about their day. Keep replies short (two to four sentences), reflect back what you heard, and \
ask at most one gentle follow-up question. Never give medical advice.\n\n\
Whenever the user's latest message mentions how their day went, call the record_daily_log tool \
with only the fields they actually stated: mood_score and energy_level as integers from 1 to 10, \
and short quotes or paraphrases for notable_events, challenges, achievements, gratitude, \
self_care_actions and support_needed. Leave out anything they did not say. Always put your \
reply to the user in the tool's reply field as well as in plain text.";

const TEXT_FIELDS: [&str; 6] = [
    "notable_events",
    "challenges",
    "achievements",
    "gratitude",
    "self_care_actions",
    "support_needed",
];

/// Tool schema listing exactly the fields a turn may set.
pub fn record_tool() -> ToolSpec {
    let score = |what: &str| {
        json!({
            "type": "integer",
            "minimum": 1,
            "maximum": 10,
            "description": format!("{what} on a 1-10 scale, only if the user stated it"),
        })
    };
    let text = |what: &str| json!({ "type": "string", "description": what });

    ToolSpec {
        name: RECORD_TOOL_NAME.to_string(),
        description: "Record the parts of today's journal entry the user mentioned in their \
                      latest message."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "reply": text("Your reply to the user, the same words you would say in plain text"),
                "mood_score": score("Overall mood"),
                "energy_level": score("Energy level"),
                "notable_events": text("Notable things that happened today"),
                "challenges": text("Difficulties or stressors"),
                "achievements": text("Things the user accomplished"),
                "gratitude": text("Things the user is grateful for"),
                "self_care_actions": text("Self-care the user did"),
                "support_needed": text("Help or support the user says they need"),
            },
            "required": [REPLY_FIELD],
            "additionalProperties": false,
        }),
    }
}

/// Persona, then history in order, then the new message.
pub fn compose_request(
    history: &[ChatMessage],
    message: &str,
    structured: bool,
    max_tokens: u32,
) -> ModelRequest {
    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(message));

    ModelRequest {
        system: PERSONA.to_string(),
        messages,
        tool: structured.then(record_tool),
        max_tokens,
    }
}

fn score_field(input: &Value, key: &str) -> Option<i32> {
    let value = input.get(key).filter(|v| !v.is_null())?;
    let score = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .and_then(|n| i32::try_from(n).ok());

    match score {
        Some(s) if score_in_range(s) => Some(s),
        _ => {
            tracing::warn!(field = key, value = %value, "Dropping invalid score from tool payload");
            None
        }
    }
}

fn text_field(input: &Value, key: &str) -> Option<String> {
    match input.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => {
            tracing::warn!(field = key, value = %other, "Dropping non-text field from tool payload");
            None
        }
    }
}

/// Reads the tool payload field by field. Invalid fields are dropped, the
/// rest of the payload is kept; unknown keys are ignored.
pub fn delta_from_tool_input(input: &Value) -> LogDelta {
    let mut texts = TEXT_FIELDS.iter().map(|k| text_field(input, k));
    LogDelta {
        mood_score: score_field(input, "mood_score"),
        energy_level: score_field(input, "energy_level"),
        notable_events: texts.next().flatten(),
        challenges: texts.next().flatten(),
        achievements: texts.next().flatten(),
        gratitude: texts.next().flatten(),
        self_care_actions: texts.next().flatten(),
        support_needed: texts.next().flatten(),
    }
    .normalized()
}

/// The text to return to the user: the text blocks if any, otherwise the
/// tool's `reply` field. `None` when both are blank.
pub fn reply_text(reply: &ModelReply) -> Option<String> {
    if !reply.text.trim().is_empty() {
        return Some(reply.text.trim().to_string());
    }
    reply
        .tool_input
        .as_ref()
        .and_then(|input| input.get(REPLY_FIELD))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn derive_delta(message: &str, reply: &ModelReply) -> LogDelta {
    match &reply.tool_input {
        Some(input) => delta_from_tool_input(input),
        None => {
            tracing::debug!("No structured payload, using degraded score parser");
            fallback::parse_scores(message, &reply.text)
        }
    }
}

/// Runs one daily-log turn: a single model call, then a single upsert.
/// Nothing is written unless the model produced a usable reply.
pub async fn log_turn(
    state: &AppState,
    user_id: &str,
    message: &str,
    history: &[ChatMessage],
    input_type: InputType,
    today: NaiveDate,
) -> AppResult<String> {
    let request = compose_request(
        history,
        message,
        state.config.llm_structured_output,
        state.config.llm_max_tokens,
    );

    let reply = complete_with_timeout(state.model.as_ref(), &request, state.config.llm_timeout).await?;
    let Some(text) = reply_text(&reply) else {
        return Err(AppError::UpstreamModel("model returned an empty reply".into()));
    };

    let delta = derive_delta(message, &reply);
    let write = LogWrite {
        user_id: user_id.to_string(),
        log_date: today,
        delta,
        raw_input: message.to_string(),
        source_agent: SOURCE_AGENT.to_string(),
        input_type,
    };

    let log = state.store.upsert_daily_log(&write).await?;
    tracing::info!(
        user_id = %log.user_id,
        log_date = %log.log_date,
        structured = reply.tool_input.is_some(),
        "Daily log merged"
    );

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_compose_appends_message_after_history() {
        let history = vec![ChatMessage::user("morning"), ChatMessage::assistant("how are you?")];
        let req = compose_request(&history, "tired", true, 512);
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[2].role, Role::User);
        assert_eq!(req.messages[2].content, "tired");
        assert_eq!(req.tool.as_ref().map(|t| t.name.as_str()), Some(RECORD_TOOL_NAME));
        assert_eq!(req.max_tokens, 512);
    }

    #[test]
    fn test_compose_without_structured_output_has_no_tool() {
        let req = compose_request(&[], "hi", false, 512);
        assert!(req.tool.is_none());
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn test_tool_schema_lists_all_fields() {
        let tool = record_tool();
        let props = tool.input_schema["properties"].as_object().unwrap();
        assert_eq!(props.len(), 9);
        assert_eq!(props["mood_score"]["maximum"], 10);
        assert_eq!(tool.input_schema["required"], json!([REPLY_FIELD]));
        for key in TEXT_FIELDS {
            assert!(props.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_tool_payload_maps_fields() {
        let input = json!({
            "mood_score": 8,
            "energy_level": 5.0,
            "gratitude": " my dog ",
            "achievements": "shipped the release",
            "unexpected": "ignored"
        });
        let delta = delta_from_tool_input(&input);
        assert_eq!(delta.mood_score, Some(8));
        assert_eq!(delta.energy_level, Some(5));
        assert_eq!(delta.gratitude.as_deref(), Some("my dog"));
        assert_eq!(delta.achievements.as_deref(), Some("shipped the release"));
        assert_eq!(delta.challenges, None);
    }

    #[test]
    fn test_tool_payload_drops_invalid_fields_only() {
        let input = json!({
            "mood_score": 42,
            "energy_level": "high",
            "challenges": 3,
            "notable_events": "dinner with friends"
        });
        let delta = delta_from_tool_input(&input);
        assert_eq!(delta.mood_score, None);
        assert_eq!(delta.energy_level, None);
        assert_eq!(delta.challenges, None);
        assert_eq!(delta.notable_events.as_deref(), Some("dinner with friends"));
    }

    #[test]
    fn test_null_fields_are_absent() {
        let input = json!({ "mood_score": null, "energy_level": 6, "gratitude": null });
        let delta = delta_from_tool_input(&input);
        assert_eq!(delta.mood_score, None);
        assert_eq!(delta.energy_level, Some(6));
        assert_eq!(delta.gratitude, None);
    }

    #[test]
    fn test_reply_field_is_not_journaled() {
        let delta = delta_from_tool_input(&json!({ "reply": "Sounds like a good day!" }));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_reply_text_prefers_text_block() {
        let reply = ModelReply {
            text: "From text.".into(),
            tool_input: Some(json!({ "reply": "From tool." })),
        };
        assert_eq!(reply_text(&reply).as_deref(), Some("From text."));
    }

    #[test]
    fn test_reply_text_falls_back_to_tool_reply() {
        let reply = ModelReply {
            text: String::new(),
            tool_input: Some(json!({ "reply": " Glad you slept well. ", "mood_score": 8 })),
        };
        assert_eq!(reply_text(&reply).as_deref(), Some("Glad you slept well."));
    }

    #[test]
    fn test_reply_text_none_when_both_blank() {
        let reply = ModelReply { text: "  ".into(), tool_input: Some(json!({ "reply": "" })) };
        assert_eq!(reply_text(&reply), None);
        let reply = ModelReply { text: String::new(), tool_input: Some(json!({ "mood_score": 8 })) };
        assert_eq!(reply_text(&reply), None);
    }

    #[test]
    fn test_derive_delta_prefers_tool_payload() {
        let reply = ModelReply {
            text: "Your mood sounds like a 2 today.".into(),
            tool_input: Some(json!({ "energy_level": 7 })),
        };
        let delta = derive_delta("energy 7", &reply);
        assert_eq!(delta.energy_level, Some(7));
        assert_eq!(delta.mood_score, None);
    }

    #[test]
    fn test_derive_delta_falls_back_to_scores() {
        let reply = ModelReply { text: "Thanks!".into(), tool_input: None };
        let delta = derive_delta("mood is 6 today", &reply);
        assert_eq!(delta.mood_score, Some(6));
    }
}
