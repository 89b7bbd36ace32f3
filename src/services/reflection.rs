//! Weekly reflection: a fixed run of single-topic questions, one per turn,
//! ending in a model-written summary. The client carries the current step
//! between requests, so the server keeps no session.

use chrono::{NaiveDate, Utc};

use crate::dto::ReflectionState;
use crate::error::{AppError, AppResult};
use crate::llm::{complete_with_timeout, ChatMessage, ModelRequest};
use crate::models::daily_log::week_start;
use crate::models::reflection::{ReflectionDelta, ReflectionStep, WeeklyReflection};
use crate::AppState;

const SUMMARY_PERSONA: &str = "You are a supportive journaling coach. Summarize the user's \
weekly reflection in three to five warm sentences addressed to them: name the overall mood and \
energy, celebrate the wins, acknowledge the challenges, and end with encouragement for their \
plans. Do not invent details they did not share.";

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionTurn {
    pub reply: String,
    pub state: ReflectionState,
}

/// Opens the flow. No model call and no write.
pub fn start(today: NaiveDate) -> ReflectionTurn {
    let step = ReflectionStep::AskMood;
    ReflectionTurn {
        reply: step.question().to_string(),
        state: ReflectionState { step, week_start: week_start(today) },
    }
}

pub fn summary_request(row: &WeeklyReflection, max_tokens: u32) -> ModelRequest {
    let answers = row
        .answers()
        .into_iter()
        .map(|(label, answer)| format!("{label}: {answer}"))
        .collect::<Vec<_>>()
        .join("\n");

    ModelRequest {
        system: SUMMARY_PERSONA.to_string(),
        messages: vec![ChatMessage::user(format!(
            "My weekly reflection for the week of {}:\n{}",
            row.week_start_date, answers
        ))],
        tool: None,
        max_tokens,
    }
}

/// Records `answer` for the current step and moves one step forward.
pub async fn advance(
    state: &AppState,
    user_id: &str,
    current: ReflectionState,
    answer: &str,
) -> AppResult<ReflectionTurn> {
    if week_start(current.week_start) != current.week_start {
        return Err(AppError::InvalidInput("reflection.weekStart must be a Monday".into()));
    }

    let step = current.step;
    let next = step.next();
    let answer_delta = ReflectionDelta::answer(step, answer);

    if !next.is_terminal() {
        state
            .store
            .upsert_reflection(user_id, current.week_start, &answer_delta)
            .await?;
        tracing::debug!(user_id = %user_id, step = step.as_str(), "Reflection answer stored");

        return Ok(ReflectionTurn {
            reply: next.question().to_string(),
            state: ReflectionState { step: next, week_start: current.week_start },
        });
    }

    // Last answer: summarize first, then write the answer and summary together.
    let now = Utc::now();
    let mut row = state
        .store
        .get_reflection(user_id, current.week_start)
        .await?
        .unwrap_or_else(|| WeeklyReflection::empty(user_id, current.week_start, now));
    answer_delta.apply_to(&mut row);

    let request = summary_request(&row, state.config.llm_max_tokens);
    let reply = complete_with_timeout(state.model.as_ref(), &request, state.config.llm_timeout).await?;
    if reply.text.is_empty() {
        return Err(AppError::UpstreamModel("model returned an empty summary".into()));
    }

    let final_delta = ReflectionDelta {
        summary: Some(reply.text.clone()),
        completed_at: Some(now),
        ..answer_delta
    };
    state
        .store
        .upsert_reflection(user_id, current.week_start, &final_delta)
        .await?;
    tracing::info!(user_id = %user_id, week_start = %current.week_start, "Weekly reflection completed");

    Ok(ReflectionTurn {
        reply: reply.text,
        state: ReflectionState { step: next, week_start: current.week_start },
    })
}
