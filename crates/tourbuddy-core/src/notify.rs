//! Trip reminders.
//!
//! Saving a trip never schedules anything itself. `ReminderHook` listens to
//! a trip manager's `Committed` events and, for each newly created trip,
//! asks a `NotificationScheduler` for a reminder one hour before departure.
//! Scheduling is best-effort: failures are logged and never reach the code
//! that saved the trip.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::manager::Committed;
use crate::models::Trip;

/// Title shown on every reminder
pub const REMINDER_TITLE: &str = "Tour Buddy";

#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    async fn schedule_at(&self, at: DateTime<Utc>, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub at: DateTime<Utc>,
    pub title: String,
    pub message: String,
}

/// Reminders kept on local disk until they fall due.
pub struct ReminderQueue {
    cache: CacheManager,
    // Serializes read-modify-write of the reminders file
    lock: Mutex<()>,
}

impl ReminderQueue {
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache,
            lock: Mutex::new(()),
        }
    }

    /// Reminders not yet due, soonest first.
    pub async fn pending(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let _guard = self.lock.lock().await;
        let mut pending: Vec<_> = self
            .cache
            .load_reminders()?
            .into_iter()
            .filter(|r| r.at > now)
            .collect();
        pending.sort_by_key(|r| r.at);
        Ok(pending)
    }

    /// Remove and return every reminder due at `now`.
    pub async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let _guard = self.lock.lock().await;
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .cache
            .load_reminders()?
            .into_iter()
            .partition(|r| r.at <= now);
        if !due.is_empty() {
            self.cache.save_reminders(&pending)?;
        }
        due.sort_by_key(|r| r.at);
        Ok(due)
    }
}

#[async_trait]
impl NotificationScheduler for ReminderQueue {
    async fn schedule_at(&self, at: DateTime<Utc>, message: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut reminders = self.cache.load_reminders()?;
        reminders.push(Reminder {
            at,
            title: REMINDER_TITLE.to_string(),
            message: message.to_string(),
        });
        self.cache.save_reminders(&reminders)?;
        debug!(%at, "Reminder queued");
        Ok(())
    }
}

/// When to remind about `trip`: an hour before departure, or right away if
/// that moment has already passed.
pub fn reminder_time(trip: &Trip, now: DateTime<Utc>) -> DateTime<Utc> {
    trip.reminder_at().max(now)
}

/// Schedules a reminder for every trip the manager creates.
/// Edits and deletes leave existing reminders alone.
#[derive(Clone)]
pub struct ReminderHook {
    scheduler: Arc<dyn NotificationScheduler>,
}

impl ReminderHook {
    pub fn new(scheduler: Arc<dyn NotificationScheduler>) -> Self {
        Self { scheduler }
    }

    pub async fn handle(&self, event: &Committed<Trip>) -> bool {
        self.handle_at(event, Utc::now()).await
    }

    /// Returns whether a reminder was scheduled.
    pub async fn handle_at(&self, event: &Committed<Trip>, now: DateTime<Utc>) -> bool {
        let Committed::Created(record) = event else {
            return false;
        };
        let trip = &record.fields;
        let at = reminder_time(trip, now);
        match self.scheduler.schedule_at(at, &trip.reminder_message()).await {
            Ok(()) => {
                info!(trip_id = %record.id, %at, "Trip reminder scheduled");
                true
            }
            Err(e) => {
                warn!(trip_id = %record.id, error = %e, "Failed to schedule trip reminder");
                false
            }
        }
    }

    /// Handle every event already waiting on `rx`. Returns how many
    /// reminders were scheduled.
    pub async fn drain(&self, rx: &mut broadcast::Receiver<Committed<Trip>>) -> usize {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Reminder hook fell behind, some trips have no reminder");
                }
                Err(_) => break,
            }
        }
        join_all(events.iter().map(|event| self.handle(event)))
            .await
            .into_iter()
            .filter(|scheduled| *scheduled)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ListResourceManager;
    use crate::models::{Record, TripDraft};
    use crate::store::InMemoryStore;
    use crate::test_support::TempDir;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: StdMutex<Vec<(DateTime<Utc>, String)>>,
    }

    #[async_trait]
    impl NotificationScheduler for RecordingScheduler {
        async fn schedule_at(&self, at: DateTime<Utc>, message: &str) -> Result<()> {
            self.scheduled.lock().unwrap().push((at, message.to_string()));
            Ok(())
        }
    }

    struct FailingScheduler;

    #[async_trait]
    impl NotificationScheduler for FailingScheduler {
        async fn schedule_at(&self, _at: DateTime<Utc>, _message: &str) -> Result<()> {
            Err(anyhow::anyhow!("notifications disabled"))
        }
    }

    fn trip_record(name: &str, date: DateTime<Utc>) -> Record<Trip> {
        Record {
            id: "t1".into(),
            owner_id: None,
            fields: Trip { name: name.into(), date },
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_created_trip_schedules_an_hour_early() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let hook = ReminderHook::new(scheduler.clone());

        let event = Committed::Created(trip_record("Goa", now() + Duration::hours(6)));
        assert!(hook.handle_at(&event, now()).await);

        let scheduled = scheduler.scheduled.lock().unwrap().clone();
        assert_eq!(scheduled, vec![(now() + Duration::hours(5), "Your trip to Goa starts in 1 hour!".to_string())]);
    }

    #[tokio::test]
    async fn test_imminent_trip_reminds_immediately() {
        let trip = Trip { name: "Goa".into(), date: now() + Duration::minutes(20) };
        assert_eq!(reminder_time(&trip, now()), now());
    }

    #[tokio::test]
    async fn test_updates_and_deletes_are_ignored() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let hook = ReminderHook::new(scheduler.clone());
        let updated = Committed::Updated(trip_record("Goa", now() + Duration::hours(6)));
        assert!(!hook.handle_at(&updated, now()).await);
        assert!(!hook.handle_at(&Committed::Deleted { id: "t1".into() }, now()).await);
        assert!(scheduler.scheduled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scheduler_failure_does_not_fail_the_save() {
        let store = InMemoryStore::new();
        let mut trips: ListResourceManager<Trip> = ListResourceManager::new(Arc::new(store.clone()));
        let mut rx = trips.subscribe();
        let hook = ReminderHook::new(Arc::new(FailingScheduler));

        trips.set_draft(TripDraft {
            name: "Ooty".into(),
            date: Some(Utc::now() + Duration::days(3)),
        });
        let saved = trips.save(None).await.unwrap();
        assert_eq!(hook.drain(&mut rx).await, 0);
        assert_eq!(trips.records().len(), 1);
        assert_eq!(trips.records()[0].id, saved.id);
    }

    #[tokio::test]
    async fn test_drain_schedules_created_trips() {
        let store = InMemoryStore::new();
        let mut trips: ListResourceManager<Trip> = ListResourceManager::new(Arc::new(store.clone()));
        let mut rx = trips.subscribe();
        let scheduler = Arc::new(RecordingScheduler::default());
        let hook = ReminderHook::new(scheduler.clone());

        for name in ["Goa", "Ooty"] {
            trips.set_draft(TripDraft {
                name: name.into(),
                date: Some(Utc::now() + Duration::days(3)),
            });
            trips.save(None).await.unwrap();
        }
        assert_eq!(hook.drain(&mut rx).await, 2);
        assert_eq!(hook.drain(&mut rx).await, 0);
    }

    #[tokio::test]
    async fn test_reminder_queue_take_due() {
        let dir = TempDir::new("reminders");
        let queue = ReminderQueue::new(CacheManager::new(dir.path().to_path_buf()).unwrap());

        queue.schedule_at(now() - Duration::minutes(1), "due").await.unwrap();
        queue.schedule_at(now() + Duration::hours(2), "later").await.unwrap();

        let due = queue.take_due(now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message, "due");
        assert_eq!(due[0].title, REMINDER_TITLE);

        let pending = queue.pending(now()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(queue.take_due(now()).await.unwrap().is_empty());
    }
}
