use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{query, query_as, sqlite::SqlitePool};
use tokio::sync::Mutex;

use crate::{
    domain::{Classification, DetectionRecord, ScanStats},
    guard::DetectionStore,
};

pub const LAST_DETECTION_KEY: &str = "lastDetection";
pub const STATS_KEY: &str = "stats";

/// JSON key-value state that outlives individual events.
pub struct StateRepository {
    pool: SqlitePool,
    timezone: Tz,
    // Serializes read-modify-write cycles on the stats row.
    stats_lock: Mutex<()>,
}

impl StateRepository {
    pub fn new(pool: SqlitePool, timezone: Tz) -> Self {
        Self {
            pool,
            timezone,
            stats_lock: Mutex::new(()),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String,)> = query_as(r#"SELECT value FROM kv_state WHERE key = ?1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(value,)| {
            serde_json::from_str(&value).with_context(|| format!("corrupt state for key {key}"))
        })
        .transpose()
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        query(
            r#"INSERT OR REPLACE INTO kv_state (key, value, updated_at)
                VALUES (?1, ?2, CURRENT_TIMESTAMP)"#,
        )
        .bind(key)
        .bind(encoded)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        let affected = query(r#"DELETE FROM kv_state WHERE key = ?1"#)
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Current stats, reset to zero scans when the stored day is not today.
    pub async fn load_stats(&self) -> Result<ScanStats> {
        let _lock = self.stats_lock.lock().await;
        self.load_stats_locked().await
    }

    pub async fn record_scan(&self, classification: Classification) -> Result<ScanStats> {
        let _lock = self.stats_lock.lock().await;
        let mut stats = self.load_stats_locked().await?;
        stats.record_scan(classification);
        self.put_json(STATS_KEY, &stats).await?;
        Ok(stats)
    }

    async fn load_stats_locked(&self) -> Result<ScanStats> {
        let today = self.today();
        let Some(mut stats) = self.get_json::<ScanStats>(STATS_KEY).await? else {
            return Ok(ScanStats::new(today));
        };
        if stats.roll_over(today) {
            self.put_json(STATS_KEY, &stats).await?;
            tracing::info!(target: "db", day = %stats.last_reset, "daily scan counter reset");
        }
        Ok(stats)
    }
}

impl DetectionStore for StateRepository {
    fn save_detection(&self, record: DetectionRecord) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.put_json(LAST_DETECTION_KEY, &record).await })
    }

    fn load_detection(&self) -> BoxFuture<'_, Result<Option<DetectionRecord>>> {
        Box::pin(self.get_json(LAST_DETECTION_KEY))
    }

    fn clear_detection(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.remove(LAST_DETECTION_KEY).await?;
            Ok(())
        })
    }
}
