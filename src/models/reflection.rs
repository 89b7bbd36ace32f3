use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::daily_log::{clean_text, overwrite};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WeeklyReflection {
    pub id: Uuid,
    pub user_id: String,
    pub week_start_date: NaiveDate,
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub wins: Option<String>,
    pub challenges: Option<String>,
    pub gratitude: Option<String>,
    pub plans: Option<String>,
    pub summary: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflectionDelta {
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub wins: Option<String>,
    pub challenges: Option<String>,
    pub gratitude: Option<String>,
    pub plans: Option<String>,
    pub summary: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Steps of the weekly reflection conversation, in order. The flow only
/// ever moves forward and stops at `Summarize`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReflectionStep {
    AskMood,
    AskEnergy,
    AskWins,
    AskChallenges,
    AskGratitude,
    AskPlans,
    Summarize,
}

impl ReflectionStep {
    pub fn next(self) -> Self {
        match self {
            ReflectionStep::AskMood => ReflectionStep::AskEnergy,
            ReflectionStep::AskEnergy => ReflectionStep::AskWins,
            ReflectionStep::AskWins => ReflectionStep::AskChallenges,
            ReflectionStep::AskChallenges => ReflectionStep::AskGratitude,
            ReflectionStep::AskGratitude => ReflectionStep::AskPlans,
            ReflectionStep::AskPlans | ReflectionStep::Summarize => ReflectionStep::Summarize,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ReflectionStep::Summarize
    }

    /// Fixed question asked when the flow enters this step.
    pub fn question(self) -> &'static str {
        match self {
            ReflectionStep::AskMood => {
                "Let's reflect on your week. Overall, how would you describe your mood this week?"
            }
            ReflectionStep::AskEnergy => "How were your energy levels across the week?",
            ReflectionStep::AskWins => "What went well this week? Any wins, big or small?",
            ReflectionStep::AskChallenges => "What felt hard or challenging this week?",
            ReflectionStep::AskGratitude => "What are you grateful for from this week?",
            ReflectionStep::AskPlans => "What would you like to focus on next week?",
            ReflectionStep::Summarize => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReflectionStep::AskMood => "ASK_MOOD",
            ReflectionStep::AskEnergy => "ASK_ENERGY",
            ReflectionStep::AskWins => "ASK_WINS",
            ReflectionStep::AskChallenges => "ASK_CHALLENGES",
            ReflectionStep::AskGratitude => "ASK_GRATITUDE",
            ReflectionStep::AskPlans => "ASK_PLANS",
            ReflectionStep::Summarize => "SUMMARIZE",
        }
    }
}

impl ReflectionDelta {
    /// The delta that records `answer` as the reply to `step`'s question.
    pub fn answer(step: ReflectionStep, answer: &str) -> Self {
        let answer = clean_text(Some(answer.to_string()));
        let mut delta = Self::default();
        match step {
            ReflectionStep::AskMood => delta.mood = answer,
            ReflectionStep::AskEnergy => delta.energy = answer,
            ReflectionStep::AskWins => delta.wins = answer,
            ReflectionStep::AskChallenges => delta.challenges = answer,
            ReflectionStep::AskGratitude => delta.gratitude = answer,
            ReflectionStep::AskPlans => delta.plans = answer,
            ReflectionStep::Summarize => {}
        }
        delta
    }

    pub fn apply_to(&self, row: &mut WeeklyReflection) {
        overwrite(&mut row.mood, &self.mood);
        overwrite(&mut row.energy, &self.energy);
        overwrite(&mut row.wins, &self.wins);
        overwrite(&mut row.challenges, &self.challenges);
        overwrite(&mut row.gratitude, &self.gratitude);
        overwrite(&mut row.plans, &self.plans);
        overwrite(&mut row.summary, &self.summary);
        overwrite(&mut row.completed_at, &self.completed_at);
    }
}

impl WeeklyReflection {
    pub fn empty(user_id: &str, week_start_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            week_start_date,
            mood: None,
            energy: None,
            wins: None,
            challenges: None,
            gratitude: None,
            plans: None,
            summary: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Question/answer pairs recorded so far, in flow order.
    pub fn answers(&self) -> Vec<(&'static str, &str)> {
        [
            ("Mood", &self.mood),
            ("Energy", &self.energy),
            ("Wins", &self.wins),
            ("Challenges", &self.challenges),
            ("Gratitude", &self.gratitude),
            ("Plans for next week", &self.plans),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}
