use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const SCORE_MIN: i32 = 1;
pub const SCORE_MAX: i32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DailyLog {
    pub id: Uuid,
    pub user_id: String,
    pub log_date: NaiveDate,
    pub week_start_date: NaiveDate,
    pub mood_score: Option<i32>,
    pub energy_level: Option<i32>,
    pub notable_events: Option<String>,
    pub challenges: Option<String>,
    pub achievements: Option<String>,
    pub gratitude: Option<String>,
    pub self_care_actions: Option<String>,
    pub support_needed: Option<String>,
    pub raw_input: Option<String>,
    pub source_agent: Option<String>,
    pub input_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields extracted from one conversational turn. `None` means the turn
/// said nothing about that field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogDelta {
    pub mood_score: Option<i32>,
    pub energy_level: Option<i32>,
    pub notable_events: Option<String>,
    pub challenges: Option<String>,
    pub achievements: Option<String>,
    pub gratitude: Option<String>,
    pub self_care_actions: Option<String>,
    pub support_needed: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Chat,
    Voice,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Chat => "chat",
            InputType::Voice => "voice",
        }
    }
}

/// Everything written for one turn besides the extracted fields.
#[derive(Debug, Clone)]
pub struct LogWrite {
    pub user_id: String,
    pub log_date: NaiveDate,
    pub delta: LogDelta,
    pub raw_input: String,
    pub source_agent: String,
    pub input_type: InputType,
}

#[derive(Debug, Deserialize)]
pub struct DailyLogQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_monday(); // Mon=0
    date - Duration::days(weekday as i64)
}

pub fn score_in_range(score: i32) -> bool {
    (SCORE_MIN..=SCORE_MAX).contains(&score)
}

impl LogDelta {
    pub fn is_empty(&self) -> bool {
        *self == LogDelta::default()
    }

    /// Drops out-of-range scores and blank text so that nothing but real
    /// values can overwrite stored ones.
    pub fn normalized(self) -> Self {
        Self {
            mood_score: self.mood_score.filter(|s| score_in_range(*s)),
            energy_level: self.energy_level.filter(|s| score_in_range(*s)),
            notable_events: clean_text(self.notable_events),
            challenges: clean_text(self.challenges),
            achievements: clean_text(self.achievements),
            gratitude: clean_text(self.gratitude),
            self_care_actions: clean_text(self.self_care_actions),
            support_needed: clean_text(self.support_needed),
        }
    }

    /// Last-non-null-wins merge of this delta into a stored row.
    pub fn apply_to(&self, log: &mut DailyLog) {
        overwrite(&mut log.mood_score, &self.mood_score);
        overwrite(&mut log.energy_level, &self.energy_level);
        overwrite(&mut log.notable_events, &self.notable_events);
        overwrite(&mut log.challenges, &self.challenges);
        overwrite(&mut log.achievements, &self.achievements);
        overwrite(&mut log.gratitude, &self.gratitude);
        overwrite(&mut log.self_care_actions, &self.self_care_actions);
        overwrite(&mut log.support_needed, &self.support_needed);
    }
}

impl DailyLog {
    /// Row produced by the first write of a day.
    pub fn from_first_write(write: &LogWrite, now: DateTime<Utc>) -> Self {
        let mut log = Self {
            id: Uuid::new_v4(),
            user_id: write.user_id.clone(),
            log_date: write.log_date,
            week_start_date: week_start(write.log_date),
            mood_score: None,
            energy_level: None,
            notable_events: None,
            challenges: None,
            achievements: None,
            gratitude: None,
            self_care_actions: None,
            support_needed: None,
            raw_input: None,
            source_agent: None,
            input_type: None,
            created_at: now,
            updated_at: now,
        };
        log.merge(write, now);
        log
    }

    /// Applies a later write for the same `(user_id, log_date)`.
    pub fn merge(&mut self, write: &LogWrite, now: DateTime<Utc>) {
        write.delta.apply_to(self);
        self.raw_input = Some(write.raw_input.clone());
        self.source_agent = Some(write.source_agent.clone());
        self.input_type = Some(write.input_type.as_str().to_string());
        self.updated_at = now;
    }
}

pub(crate) fn overwrite<T: Clone>(stored: &mut Option<T>, incoming: &Option<T>) {
    if let Some(value) = incoming {
        *stored = Some(value.clone());
    }
}

pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
