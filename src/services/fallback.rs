//! Degraded-mode field recovery, used only when the model returned no
//! structured payload. It reads explicit numeric scores tied to a known
//! label and nothing else; text fields are never inferred here.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::daily_log::{score_in_range, LogDelta};

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b(mood|energy)\b
            (?:\s+(?:level|levels|score))?
            \s*
            (?:(?:is|was|at|of|about|around|roughly|maybe|a|an|like|rated|:|=)\s*|-\s+){0,4}
            (\d{1,2})
            ([.,]\d)?
            \b
            (?:\s*(?:/\s*10|out\s+of\s+10))?
            ",
        )
        .expect("score pattern is valid")
    })
}

/// Scores mentioned in `text`, first confident mention per field wins.
/// Fractional values ("7.5") are skipped rather than rounded. A leading
/// minus sign never matches, since `-` is only a separator when followed
/// by whitespace.
fn scan(text: &str, delta: &mut LogDelta) {
    for caps in score_pattern().captures_iter(text) {
        if caps.get(3).is_some() {
            continue;
        }
        let Some(value) = caps.get(2).and_then(|m| m.as_str().parse::<i32>().ok()) else {
            continue;
        };
        if !score_in_range(value) {
            continue;
        }
        let slot = match caps[1].to_ascii_lowercase().as_str() {
            "mood" => &mut delta.mood_score,
            _ => &mut delta.energy_level,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

/// Recovers scores from the user's message first, then from the reply.
pub fn parse_scores(message: &str, reply: &str) -> LogDelta {
    let mut delta = LogDelta::default();
    scan(message, &mut delta);
    scan(reply, &mut delta);
    delta
}
