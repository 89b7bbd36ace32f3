use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use super::store::{LogStore, StoreError};
use crate::models::cards::{CardSet, WeeklyCards};
use crate::models::daily_log::{DailyLog, LogWrite};
use crate::models::reflection::{ReflectionDelta, WeeklyReflection};

type Key = (String, NaiveDate);

/// In-process `LogStore` with the same merge semantics as `PgStore`.
/// Each upsert runs under one lock, which plays the role of the row lock
/// taken by `ON CONFLICT DO UPDATE`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    daily_logs: Arc<Mutex<HashMap<Key, DailyLog>>>,
    reflections: Arc<Mutex<HashMap<Key, WeeklyReflection>>>,
    cards: Arc<Mutex<HashMap<Key, WeeklyCards>>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful upserts across all tables.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every later upsert fail with `StoreError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn daily_log(&self, user_id: &str, log_date: NaiveDate) -> Option<DailyLog> {
        self.daily_logs
            .lock()
            .await
            .get(&(user_id.to_string(), log_date))
            .cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn upsert_daily_log(&self, write: &LogWrite) -> Result<DailyLog, StoreError> {
        self.check_writable()?;
        let now = Utc::now();
        let mut logs = self.daily_logs.lock().await;
        let key = (write.user_id.clone(), write.log_date);

        let log = match logs.get_mut(&key) {
            Some(existing) => {
                existing.merge(write, now);
                existing.clone()
            }
            None => {
                let log = DailyLog::from_first_write(write, now);
                logs.insert(key, log.clone());
                log
            }
        };

        self.record_write();
        Ok(log)
    }

    async fn list_daily_logs(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLog>, StoreError> {
        let logs = self.daily_logs.lock().await;
        let mut found: Vec<DailyLog> = logs
            .values()
            .filter(|l| l.user_id == user_id && l.log_date >= start && l.log_date <= end)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.log_date.cmp(&a.log_date));
        Ok(found)
    }

    async fn get_reflection(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReflection>, StoreError> {
        let rows = self.reflections.lock().await;
        Ok(rows.get(&(user_id.to_string(), week_start)).cloned())
    }

    async fn upsert_reflection(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        delta: &ReflectionDelta,
    ) -> Result<WeeklyReflection, StoreError> {
        self.check_writable()?;
        let now = Utc::now();
        let mut rows = self.reflections.lock().await;
        let row = rows
            .entry((user_id.to_string(), week_start))
            .or_insert_with(|| WeeklyReflection::empty(user_id, week_start, now));
        delta.apply_to(row);
        row.updated_at = now;

        let row = row.clone();
        self.record_write();
        Ok(row)
    }

    async fn get_cards(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyCards>, StoreError> {
        let rows = self.cards.lock().await;
        Ok(rows.get(&(user_id.to_string(), week_start)).cloned())
    }

    async fn upsert_cards(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        cards: &CardSet,
    ) -> Result<WeeklyCards, StoreError> {
        self.check_writable()?;
        let now = Utc::now();
        let mut rows = self.cards.lock().await;
        let key = (user_id.to_string(), week_start);

        let row = match rows.get_mut(&key) {
            Some(existing) => {
                existing.replace(cards, now);
                existing.clone()
            }
            None => {
                let row = WeeklyCards::new(user_id, week_start, cards, now);
                rows.insert(key, row.clone());
                row
            }
        };

        self.record_write();
        Ok(row)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::daily_log::{InputType, LogDelta};

    fn write(user: &str, delta: LogDelta) -> LogWrite {
        LogWrite {
            user_id: user.into(),
            log_date: NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
            delta,
            raw_input: "hi".into(),
            source_agent: "daily_log_chat".into(),
            input_type: InputType::Chat,
        }
    }

    #[tokio::test]
    async fn test_repeated_writes_keep_one_row() {
        let store = MemoryStore::new();
        store.upsert_daily_log(&write("u1", LogDelta::default())).await.unwrap();
        store.upsert_daily_log(&write("u1", LogDelta::default())).await.unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let logs = store.list_daily_logs("u1", start, end).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_merges_converge() {
        let store = MemoryStore::new();
        let mood = write("u1", LogDelta { mood_score: Some(7), ..Default::default() });
        let energy = write("u1", LogDelta { energy_level: Some(4), ..Default::default() });

        let (a, b) = tokio::join!(store.upsert_daily_log(&mood), store.upsert_daily_log(&energy));
        a.unwrap();
        b.unwrap();

        let log = store
            .daily_log("u1", NaiveDate::from_ymd_opt(2024, 6, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(log.mood_score, Some(7));
        assert_eq!(log.energy_level, Some(4));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_row_untouched() {
        let store = MemoryStore::new();
        store
            .upsert_daily_log(&write("u1", LogDelta { mood_score: Some(3), ..Default::default() }))
            .await
            .unwrap();

        store.set_fail_writes(true);
        let result = store
            .upsert_daily_log(&write("u1", LogDelta { mood_score: Some(8), ..Default::default() }))
            .await;
        assert!(result.is_err());

        let log = store
            .daily_log("u1", NaiveDate::from_ymd_opt(2024, 6, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(log.mood_score, Some(3));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user_and_sorted_desc() {
        let store = MemoryStore::new();
        for (user, day) in [("u1", 18), ("u1", 20), ("u2", 19)] {
            let mut w = write(user, LogDelta::default());
            w.log_date = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
            store.upsert_daily_log(&w).await.unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let logs = store.list_daily_logs("u1", start, end).await.unwrap();
        let days: Vec<_> = logs.iter().map(|l| l.log_date).collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 18).unwrap(),
            ]
        );
    }
}
