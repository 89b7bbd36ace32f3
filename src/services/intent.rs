use crate::dto::ChatIntent;

/// Phrases that start a weekly reflection when the client sent no explicit
/// intent. Matched against the user's own message only.
const WEEKLY_REFLECTION_PHRASES: &[&str] = &[
    "weekly reflection",
    "reflect on my week",
    "reflect on the week",
    "weekly review",
    "review my week",
    "weekly check in",
];

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// An explicit intent always wins; otherwise a keyword match on `message`.
pub fn wants_weekly_reflection(message: &str, explicit: Option<ChatIntent>) -> bool {
    match explicit {
        Some(intent) => intent == ChatIntent::WeeklyReflection,
        None => {
            let text = format!(" {} ", normalize(message));
            WEEKLY_REFLECTION_PHRASES
                .iter()
                .any(|phrase| text.contains(&format!(" {} ", phrase)))
        }
    }
}
