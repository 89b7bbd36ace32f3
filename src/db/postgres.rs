use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{LogStore, StoreError};
use crate::models::cards::{CardSet, WeeklyCards};
use crate::models::daily_log::{week_start, DailyLog, LogWrite};
use crate::models::reflection::{ReflectionDelta, WeeklyReflection};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn upsert_daily_log(&self, write: &LogWrite) -> Result<DailyLog, StoreError> {
        let delta = &write.delta;
        let log = sqlx::query_as::<_, DailyLog>(
            r#"
            INSERT INTO daily_logs (
                id, user_id, log_date, week_start_date,
                mood_score, energy_level, notable_events, challenges,
                achievements, gratitude, self_care_actions, support_needed,
                raw_input, source_agent, input_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (user_id, log_date) DO UPDATE SET
                mood_score = COALESCE(EXCLUDED.mood_score, daily_logs.mood_score),
                energy_level = COALESCE(EXCLUDED.energy_level, daily_logs.energy_level),
                notable_events = COALESCE(EXCLUDED.notable_events, daily_logs.notable_events),
                challenges = COALESCE(EXCLUDED.challenges, daily_logs.challenges),
                achievements = COALESCE(EXCLUDED.achievements, daily_logs.achievements),
                gratitude = COALESCE(EXCLUDED.gratitude, daily_logs.gratitude),
                self_care_actions = COALESCE(EXCLUDED.self_care_actions, daily_logs.self_care_actions),
                support_needed = COALESCE(EXCLUDED.support_needed, daily_logs.support_needed),
                raw_input = EXCLUDED.raw_input,
                source_agent = EXCLUDED.source_agent,
                input_type = EXCLUDED.input_type,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&write.user_id)
        .bind(write.log_date)
        .bind(week_start(write.log_date))
        .bind(delta.mood_score)
        .bind(delta.energy_level)
        .bind(&delta.notable_events)
        .bind(&delta.challenges)
        .bind(&delta.achievements)
        .bind(&delta.gratitude)
        .bind(&delta.self_care_actions)
        .bind(&delta.support_needed)
        .bind(&write.raw_input)
        .bind(&write.source_agent)
        .bind(write.input_type.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(log)
    }

    async fn list_daily_logs(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLog>, StoreError> {
        let logs = sqlx::query_as::<_, DailyLog>(
            r#"
            SELECT * FROM daily_logs
            WHERE user_id = $1 AND log_date BETWEEN $2 AND $3
            ORDER BY log_date DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }

    async fn get_reflection(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReflection>, StoreError> {
        let row = sqlx::query_as::<_, WeeklyReflection>(
            "SELECT * FROM weekly_reflections WHERE user_id = $1 AND week_start_date = $2",
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    async fn upsert_reflection(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        delta: &ReflectionDelta,
    ) -> Result<WeeklyReflection, StoreError> {
        let row = sqlx::query_as::<_, WeeklyReflection>(
            r#"
            INSERT INTO weekly_reflections (
                id, user_id, week_start_date,
                mood, energy, wins, challenges, gratitude, plans,
                summary, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, week_start_date) DO UPDATE SET
                mood = COALESCE(EXCLUDED.mood, weekly_reflections.mood),
                energy = COALESCE(EXCLUDED.energy, weekly_reflections.energy),
                wins = COALESCE(EXCLUDED.wins, weekly_reflections.wins),
                challenges = COALESCE(EXCLUDED.challenges, weekly_reflections.challenges),
                gratitude = COALESCE(EXCLUDED.gratitude, weekly_reflections.gratitude),
                plans = COALESCE(EXCLUDED.plans, weekly_reflections.plans),
                summary = COALESCE(EXCLUDED.summary, weekly_reflections.summary),
                completed_at = COALESCE(EXCLUDED.completed_at, weekly_reflections.completed_at),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(week_start)
        .bind(&delta.mood)
        .bind(&delta.energy)
        .bind(&delta.wins)
        .bind(&delta.challenges)
        .bind(&delta.gratitude)
        .bind(&delta.plans)
        .bind(&delta.summary)
        .bind(delta.completed_at)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    async fn get_cards(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyCards>, StoreError> {
        let cards = sqlx::query_as::<_, WeeklyCards>(
            "SELECT * FROM weekly_cards WHERE user_id = $1 AND week_start_date = $2",
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_optional(&self.db)
        .await?;

        Ok(cards)
    }

    async fn upsert_cards(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        cards: &CardSet,
    ) -> Result<WeeklyCards, StoreError> {
        let row = sqlx::query_as::<_, WeeklyCards>(
            r#"
            INSERT INTO weekly_cards (
                id, user_id, week_start_date, advice1, advice2, advice3, mood_energy
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, week_start_date) DO UPDATE SET
                advice1 = EXCLUDED.advice1,
                advice2 = EXCLUDED.advice2,
                advice3 = EXCLUDED.advice3,
                mood_energy = EXCLUDED.mood_energy,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(week_start)
        .bind(&cards.advice1)
        .bind(&cards.advice2)
        .bind(&cards.advice3)
        .bind(&cards.mood_energy)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
