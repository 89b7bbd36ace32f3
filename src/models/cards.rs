use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Keys the coaching-card generation must return, all of them.
pub const CARD_KEYS: [&str; 4] = ["advice1", "advice2", "advice3", "mood_energy"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WeeklyCards {
    pub id: Uuid,
    pub user_id: String,
    pub week_start_date: NaiveDate,
    pub advice1: String,
    pub advice2: String,
    pub advice3: String,
    pub mood_energy: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A complete, validated set of generated cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSet {
    pub advice1: String,
    pub advice2: String,
    pub advice3: String,
    pub mood_energy: String,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyCardsQuery {
    #[serde(rename = "weekStart")]
    pub week_start: Option<NaiveDate>,
}

impl WeeklyCards {
    pub fn new(user_id: &str, week_start_date: NaiveDate, cards: &CardSet, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            week_start_date,
            advice1: cards.advice1.clone(),
            advice2: cards.advice2.clone(),
            advice3: cards.advice3.clone(),
            mood_energy: cards.mood_energy.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn replace(&mut self, cards: &CardSet, now: DateTime<Utc>) {
        self.advice1 = cards.advice1.clone();
        self.advice2 = cards.advice2.clone();
        self.advice3 = cards.advice3.clone();
        self.mood_energy = cards.mood_energy.clone();
        self.updated_at = now;
    }
}
