use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::cards::{CardSet, WeeklyCards};
use crate::models::daily_log::{DailyLog, LogWrite};
use crate::models::reflection::{ReflectionDelta, WeeklyReflection};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Row storage for the journaling tables.
///
/// Every `upsert_*` is a single atomic merge keyed by the row's natural key:
/// present fields overwrite, absent fields keep what is stored. Callers never
/// read-modify-write, so concurrent turns for one key cannot lose updates.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn upsert_daily_log(&self, write: &LogWrite) -> Result<DailyLog, StoreError>;

    /// Logs in `[start, end]`, newest first.
    async fn list_daily_logs(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLog>, StoreError>;

    async fn get_reflection(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReflection>, StoreError>;

    async fn upsert_reflection(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        delta: &ReflectionDelta,
    ) -> Result<WeeklyReflection, StoreError>;

    async fn get_cards(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyCards>, StoreError>;

    /// Replaces all four cards for the week at once.
    async fn upsert_cards(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        cards: &CardSet,
    ) -> Result<WeeklyCards, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
