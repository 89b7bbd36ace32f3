//! Weekly coaching cards: one prompt built from this week's and last week's
//! reflections plus this week's logs, four cards back, all or nothing.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::llm::{complete_with_timeout, ChatMessage, ModelRequest};
use crate::models::cards::{CardSet, WeeklyCards, CARD_KEYS};
use crate::models::daily_log::DailyLog;
use crate::models::reflection::WeeklyReflection;
use crate::AppState;

const COACH_PERSONA: &str = "You are a wellness coach writing weekly coaching cards for a \
journaling app. Respond with a single JSON object and nothing else.";

fn describe_reflection(label: &str, row: Option<&WeeklyReflection>) -> String {
    match row {
        None => format!("{label}: no reflection recorded."),
        Some(row) => {
            let mut lines = vec![format!("{label}:")];
            lines.extend(row.answers().into_iter().map(|(k, v)| format!("- {k}: {v}")));
            if let Some(summary) = &row.summary {
                lines.push(format!("- Summary: {summary}"));
            }
            lines.join("\n")
        }
    }
}

fn describe_logs(logs: &[DailyLog]) -> String {
    if logs.is_empty() {
        return "Daily logs this week: none.".into();
    }

    let mut lines = vec!["Daily logs this week:".to_string()];
    for log in logs {
        let score = |s: Option<i32>| s.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        let mut line = format!(
            "- {} mood {} energy {}",
            log.log_date,
            score(log.mood_score),
            score(log.energy_level)
        );
        for (label, value) in [
            ("events", &log.notable_events),
            ("challenges", &log.challenges),
            ("achievements", &log.achievements),
            ("gratitude", &log.gratitude),
        ] {
            if let Some(v) = value {
                line.push_str(&format!("; {label}: {v}"));
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn build_prompt(
    this_week: Option<&WeeklyReflection>,
    last_week: Option<&WeeklyReflection>,
    logs: &[DailyLog],
) -> String {
    format!(
        r#"Write this week's coaching cards from the user's journal.

{}

{}

{}

Return a JSON object with exactly these keys:
{{
  "advice1": "one specific, actionable suggestion in exactly one sentence",
  "advice2": "a second suggestion in exactly one sentence",
  "advice3": "a third suggestion in exactly one sentence",
  "mood_energy": "one or two sentences on how mood and energy moved compared with last week"
}}"#,
        describe_reflection("This week's reflection", this_week),
        describe_reflection("Last week's reflection", last_week),
        describe_logs(logs),
    )
}

/// Slice between the first `{` and the last `}`, which drops code fences
/// and stray prose around the object.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every expected key must be a non-empty string or the whole generation is
/// rejected.
pub fn parse_cards(text: &str) -> Result<CardSet, String> {
    let span = json_object_span(text).ok_or("no JSON object in model output")?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| format!("card JSON does not parse: {e}"))?;

    let mut cards = Vec::with_capacity(CARD_KEYS.len());
    for key in CARD_KEYS {
        let card = value
            .get(key)
            .and_then(Value::as_str)
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing card `{key}`"))?;
        cards.push(card);
    }

    let mut cards = cards.into_iter();
    Ok(CardSet {
        advice1: cards.next().unwrap_or_default(),
        advice2: cards.next().unwrap_or_default(),
        advice3: cards.next().unwrap_or_default(),
        mood_energy: cards.next().unwrap_or_default(),
    })
}

pub async fn generate(state: &AppState, user_id: &str, week_start: NaiveDate) -> AppResult<WeeklyCards> {
    let last_week_start = week_start - Duration::days(7);
    let week_end = week_start + Duration::days(6);

    let this_week = state.store.get_reflection(user_id, week_start).await?;
    let last_week = state.store.get_reflection(user_id, last_week_start).await?;
    let mut logs = state.store.list_daily_logs(user_id, week_start, week_end).await?;
    logs.reverse();

    let request = ModelRequest {
        system: COACH_PERSONA.to_string(),
        messages: vec![ChatMessage::user(build_prompt(
            this_week.as_ref(),
            last_week.as_ref(),
            &logs,
        ))],
        tool: None,
        max_tokens: state.config.llm_max_tokens,
    };

    let reply = complete_with_timeout(state.model.as_ref(), &request, state.config.llm_timeout).await?;
    let cards = parse_cards(&reply.text).map_err(AppError::UpstreamModel)?;

    let row = state.store.upsert_cards(user_id, week_start, &cards).await?;
    tracing::info!(user_id = %user_id, week_start = %week_start, "Weekly cards generated");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_complete_cards() {
        let text = r#"{"advice1":"Walk after lunch.","advice2":"Sleep by 11.","advice3":"Call a friend.","mood_energy":"Mood rose, energy held steady."}"#;
        let cards = parse_cards(text).unwrap();
        assert_eq!(cards.advice2, "Sleep by 11.");
        assert_eq!(cards.mood_energy, "Mood rose, energy held steady.");
    }

    #[test]
    fn test_parse_tolerates_fences_and_prose() {
        let text = "Here you go:\n```json\n{\"advice1\":\"a\",\"advice2\":\"b\",\"advice3\":\"c\",\"mood_energy\":\"  d \\n e \"}\n```";
        let cards = parse_cards(text).unwrap();
        assert_eq!(cards.advice1, "a");
        assert_eq!(cards.mood_energy, "d e");
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let text = r#"{"advice1":"a","advice3":"c","mood_energy":"d"}"#;
        let err = parse_cards(text).unwrap_err();
        assert!(err.contains("advice2"));
    }

    #[test]
    fn test_parse_rejects_blank_or_non_string() {
        assert!(parse_cards(r#"{"advice1":" ","advice2":"b","advice3":"c","mood_energy":"d"}"#).is_err());
        assert!(parse_cards(r#"{"advice1":1,"advice2":"b","advice3":"c","mood_energy":"d"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_cards("I can't help with that.").is_err());
    }

    #[test]
    fn test_prompt_mentions_both_weeks_and_logs() {
        let week = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
        let mut this_week = WeeklyReflection::empty("u", week, Utc::now());
        this_week.wins = Some("finished a 10k".into());

        let prompt = build_prompt(Some(&this_week), None, &[]);
        assert!(prompt.contains("finished a 10k"));
        assert!(prompt.contains("Last week's reflection: no reflection recorded."));
        assert!(prompt.contains("Daily logs this week: none."));
        for key in CARD_KEYS {
            assert!(prompt.contains(&format!("\"{key}\"")));
        }
    }
}
