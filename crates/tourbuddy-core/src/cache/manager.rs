use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Record, Resource};
use crate::notify::Reminder;

/// Snapshots older than this are flagged as out of date when shown.
const STALE_AFTER_MINUTES: i64 = 60;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Cache key for the reminder queue
const REMINDERS_KEY: &str = "reminders";

/// A value plus the moment it was written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    fn at(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    pub fn age_minutes(&self) -> i64 {
        Utc::now().signed_duration_since(self.cached_at).num_minutes()
    }

    /// Coarse age such as "5m ago", "2h ago" or "3d ago". Hours and days
    /// round to the nearest unit; future timestamps read as "just now".
    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            m if m < 1 => "just now".to_string(),
            m if m < MINUTES_PER_HOUR => format!("{}m ago", m),
            m if m < MINUTES_PER_DAY => format!("{}h ago", round_div(m, MINUTES_PER_HOUR)),
            m => format!("{}d ago", round_div(m, MINUTES_PER_DAY)),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > STALE_AFTER_MINUTES
    }
}

/// Integer division rounding halves up.
fn round_div(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

/// JSON snapshots on local disk.
///
/// Holds the last list each manager loaded, for display when the store is
/// unreachable, and the pending reminder queue. Snapshots are read-only
/// fallbacks; nothing here is ever written back to the store.
#[derive(Debug, Clone)]
pub struct CacheManager {
    dir: PathBuf,
}

impl CacheManager {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.dir.join(key).with_extension("json")
    }

    fn read_snapshot<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedData<T>>> {
        let path = self.snapshot_path(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read snapshot {}", key)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .with_context(|| format!("Snapshot {} is corrupt", key))
    }

    fn write_snapshot<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(&CachedData::new(data))?;
        std::fs::write(self.snapshot_path(key), json)
            .with_context(|| format!("Failed to write snapshot {}", key))
    }

    // ===== Record snapshots =====

    pub fn load_records<T: Resource>(&self) -> Result<Option<CachedData<Vec<Record<T>>>>> {
        self.read_snapshot(T::COLLECTION)
    }

    pub fn save_records<T: Resource>(&self, records: &[Record<T>]) -> Result<()> {
        debug!(collection = T::COLLECTION, count = records.len(), "Saving snapshot");
        self.write_snapshot(T::COLLECTION, &records)
    }

    // ===== Reminders =====

    pub fn load_reminders(&self) -> Result<Vec<Reminder>> {
        Ok(self
            .read_snapshot::<Vec<Reminder>>(REMINDERS_KEY)?
            .map(|cached| cached.data)
            .unwrap_or_default())
    }

    pub fn save_reminders(&self, reminders: &[Reminder]) -> Result<()> {
        self.write_snapshot(REMINDERS_KEY, &reminders)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Expense, PackingItem};
    use crate::test_support::TempDir;
    use chrono::Duration;

    fn temp_cache(dir: &TempDir) -> CacheManager {
        CacheManager::new(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");

        cached.cached_at = Utc::now() - Duration::minutes(90);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::hours(36);
        assert_eq!(cached.age_display(), "2d ago");

        cached.cached_at = Utc::now() + Duration::minutes(5);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_snapshot_goes_stale_after_an_hour() {
        assert!(!CachedData::new(()).is_stale());
        assert!(!CachedData::at((), Utc::now() - Duration::minutes(59)).is_stale());
        assert!(CachedData::at((), Utc::now() - Duration::minutes(61)).is_stale());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new("cache-corrupt");
        let cache = temp_cache(&dir);
        std::fs::write(cache.snapshot_path(Expense::COLLECTION), "{not json").unwrap();
        assert!(cache.load_records::<Expense>().is_err());
    }

    #[test]
    fn test_record_snapshot_roundtrip() {
        let dir = TempDir::new("cache-records");
        let cache = temp_cache(&dir);
        assert!(cache.load_records::<PackingItem>().unwrap().is_none());

        let records = vec![Record {
            id: "doc-1".to_string(),
            owner_id: Some("u-1".to_string()),
            fields: PackingItem { item: "Tent".into() },
        }];
        cache.save_records(&records).unwrap();

        let cached = cache.load_records::<PackingItem>().unwrap().unwrap();
        assert_eq!(cached.data, records);
        assert!(!cached.is_stale());
        assert_eq!(cached.age_display(), "just now");
    }
}
