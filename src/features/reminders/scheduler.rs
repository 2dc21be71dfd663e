//! # Reminder Scheduler
//!
//! Keeps the timeline of pending fire events and runs the dispatcher loop.
//!
//! The durable record is the source of truth: a reminder's `fire_at` column is
//! its fire event. The in-memory `FireQueue` is rebuilt from the store at
//! startup and reconciled against `due(now)` on every poll, so re-arming a
//! recurring reminder is a single `UPDATE` and a crash between delivery and
//! re-arming can only cause a duplicate delivery, never a lost recurrence.
//!
//! Delivery is at-least-once. A failed send stays queued with its original
//! due time and is retried on the next poll.

use chrono::NaiveDateTime;
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::model::{Reminder, ReminderId};
use super::resolver::{next_after, Clock};
use super::store::ReminderStore;
use crate::core::{ReminderError, ReminderResult};
use crate::gateway::MessagingGateway;

/// Pending fire events ordered by due time, at most one per reminder
#[derive(Debug, Default)]
pub struct FireQueue {
    by_due: BTreeSet<(NaiveDateTime, ReminderId)>,
    by_id: HashMap<ReminderId, NaiveDateTime>,
}

impl FireQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue (or move) the fire event for `id`
    pub fn schedule(&mut self, id: ReminderId, due: NaiveDateTime) {
        if let Some(previous) = self.by_id.insert(id, due) {
            self.by_due.remove(&(previous, id));
        }
        self.by_due.insert((due, id));
    }

    /// Drop the pending event for `id`, returning whether one existed
    pub fn cancel(&mut self, id: ReminderId) -> bool {
        match self.by_id.remove(&id) {
            Some(due) => {
                self.by_due.remove(&(due, id));
                true
            }
            None => false,
        }
    }

    /// Remove and return every event due at or before `now`, earliest first
    pub fn take_due(&mut self, now: NaiveDateTime) -> Vec<(ReminderId, NaiveDateTime)> {
        let mut due = Vec::new();
        while let Some(&(when, id)) = self.by_due.first() {
            if when > now {
                break;
            }
            self.by_due.remove(&(when, id));
            self.by_id.remove(&id);
            due.push((id, when));
        }
        due
    }

    pub fn due_at(&self, id: ReminderId) -> Option<NaiveDateTime> {
        self.by_id.get(&id).copied()
    }

    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.by_due.first().map(|(when, _)| *when)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// What happened to one fire event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The reminder no longer exists (cancelled)
    Dropped,
    /// Record says it is not due yet; re-queued at its stored time
    NotDue(NaiveDateTime),
    /// One-off reminder delivered and deleted
    Retired,
    /// Recurring reminder delivered and moved to its next occurrence
    Rearmed(NaiveDateTime),
    /// Delivery or store write failed; retried on the next poll
    Deferred,
}

/// Per-poll tally, mostly for logging
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollSummary {
    pub dropped: usize,
    pub retired: usize,
    pub rearmed: usize,
    pub deferred: usize,
    pub not_due: usize,
}

impl PollSummary {
    fn record(&mut self, outcome: FireOutcome) {
        match outcome {
            FireOutcome::Dropped => self.dropped += 1,
            FireOutcome::NotDue(_) => self.not_due += 1,
            FireOutcome::Retired => self.retired += 1,
            FireOutcome::Rearmed(_) => self.rearmed += 1,
            FireOutcome::Deferred => self.deferred += 1,
        }
    }

    pub fn delivered(&self) -> usize {
        self.retired + self.rearmed
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fires due reminders and applies their recurrence policy
#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    queue: Arc<Mutex<FireQueue>>,
    poll_interval: Duration,
    io_timeout: Duration,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn ReminderStore>, poll_interval: Duration, io_timeout: Duration) -> Self {
        Self {
            store,
            queue: Arc::new(Mutex::new(FireQueue::new())),
            poll_interval,
            io_timeout,
        }
    }

    /// Queue a fire event at the reminder's `fire_at`, replacing any earlier one
    pub async fn schedule(&self, reminder: &Reminder) {
        self.queue.lock().await.schedule(reminder.id, reminder.fire_at);
        debug!("Scheduled reminder {} at {}", reminder.id, reminder.fire_at);
    }

    pub async fn unschedule(&self, id: ReminderId) -> bool {
        self.queue.lock().await.cancel(id)
    }

    /// Due time of the pending event for `id`, if any
    pub async fn pending_due(&self, id: ReminderId) -> Option<NaiveDateTime> {
        self.queue.lock().await.due_at(id)
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Load every stored reminder into the queue (startup recovery)
    pub async fn recover(&self) -> ReminderResult<usize> {
        let reminders = self.with_timeout(self.store.all()).await?;
        let mut queue = self.queue.lock().await;
        for reminder in &reminders {
            queue.schedule(reminder.id, reminder.fire_at);
        }
        Ok(reminders.len())
    }

    /// Fire everything due at `now`
    pub async fn poll_once(&self, gateway: &dyn MessagingGateway, now: NaiveDateTime) -> PollSummary {
        let mut batch = self.queue.lock().await.take_due(now);

        // Anything the store says is due but the queue lost track of
        match self.with_timeout(self.store.due(now)).await {
            Ok(records) => {
                for record in records {
                    if !batch.iter().any(|(id, _)| *id == record.id) {
                        self.queue.lock().await.cancel(record.id);
                        batch.push((record.id, record.fire_at));
                    }
                }
            }
            Err(e) => warn!("Could not reconcile due reminders with the store: {e}"),
        }

        let mut summary = PollSummary::default();
        for (id, due) in batch {
            let outcome = self.fire(gateway, id, due, now).await;
            summary.record(outcome);
        }
        summary
    }

    /// Run the firing protocol for one event
    async fn fire(
        &self,
        gateway: &dyn MessagingGateway,
        id: ReminderId,
        due: NaiveDateTime,
        now: NaiveDateTime,
    ) -> FireOutcome {
        let reminder = match self.with_timeout(self.store.get(id)).await {
            Ok(Some(reminder)) => reminder,
            Ok(None) => {
                debug!("Reminder {id} no longer exists, dropping fire event");
                return FireOutcome::Dropped;
            }
            Err(e) => {
                warn!("Could not load reminder {id}, retrying next poll: {e}");
                return self.defer(id, due).await;
            }
        };

        if reminder.fire_at > now {
            self.schedule(&reminder).await;
            return FireOutcome::NotDue(reminder.fire_at);
        }

        let text = reminder.delivery_text();
        let delivery = match timeout(self.io_timeout, gateway.send_text(reminder.owner, &text)).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ReminderError::DeliveryFailed(e.to_string())),
            Err(_) => Err(ReminderError::DeliveryFailed(format!(
                "timed out after {:?}",
                self.io_timeout
            ))),
        };
        if let Err(e) = delivery {
            warn!(
                "Delivery of reminder {id} to user {} failed, retrying next poll: {e}",
                reminder.owner
            );
            return self.defer(id, due).await;
        }

        // Overdue recurring reminders fire once and skip what was missed
        match next_after(reminder.fire_at, reminder.recurrence, now) {
            None => match self.with_timeout(self.store.delete(id)).await {
                Ok(()) => {
                    info!("Delivered reminder {id} to user {} and retired it", reminder.owner);
                    FireOutcome::Retired
                }
                Err(e) => {
                    error!("Delivered reminder {id} but could not delete it: {e}");
                    self.defer(id, due).await
                }
            },
            Some(next) => match self.with_timeout(self.store.update(id, next)).await {
                Ok(()) => {
                    self.queue.lock().await.schedule(id, next);
                    info!(
                        "Delivered reminder {id} to user {}, next {} at {next}",
                        reminder.owner,
                        reminder.recurrence.label()
                    );
                    FireOutcome::Rearmed(next)
                }
                Err(e) => {
                    error!("Delivered reminder {id} but could not re-arm it: {e}");
                    self.defer(id, due).await
                }
            },
        }
    }

    async fn defer(&self, id: ReminderId, due: NaiveDateTime) -> FireOutcome {
        self.queue.lock().await.schedule(id, due);
        FireOutcome::Deferred
    }

    /// Bound a store call so a hung backend cannot stall the loop
    async fn with_timeout<T, F>(&self, call: F) -> ReminderResult<T>
    where
        F: Future<Output = ReminderResult<T>>,
    {
        match timeout(self.io_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ReminderError::StoreUnavailable(format!(
                "call timed out after {:?}",
                self.io_timeout
            ))),
        }
    }

    /// Recover pending reminders, then poll forever
    pub async fn run(self, gateway: Arc<dyn MessagingGateway>, clock: Arc<dyn Clock>) {
        match self.recover().await {
            Ok(count) => info!("⏰ Reminder scheduler started with {count} pending reminders"),
            Err(e) => error!("Failed to recover pending reminders: {e}"),
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let summary = self.poll_once(gateway.as_ref(), clock.now()).await;
            if !summary.is_empty() {
                debug!("Reminder poll delivered {}: {summary:?}", summary.delivered());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::features::reminders::model::Recurrence;
    use crate::features::reminders::testing::{at, RecordingGateway};

    async fn scheduler_with_db() -> (ReminderScheduler, Arc<Database>) {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let scheduler = ReminderScheduler::new(
            db.clone(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        );
        (scheduler, db)
    }

    #[test]
    fn test_queue_schedule_replaces() {
        let mut queue = FireQueue::new();
        queue.schedule(1, at(2025, 3, 12, 9, 0));
        queue.schedule(1, at(2025, 3, 13, 9, 0));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.due_at(1), Some(at(2025, 3, 13, 9, 0)));
        assert!(queue.take_due(at(2025, 3, 12, 23, 59)).is_empty());
    }

    #[test]
    fn test_queue_take_due_in_order() {
        let mut queue = FireQueue::new();
        queue.schedule(3, at(2025, 3, 12, 11, 0));
        queue.schedule(1, at(2025, 3, 12, 9, 0));
        queue.schedule(2, at(2025, 3, 14, 9, 0));

        assert_eq!(queue.next_due(), Some(at(2025, 3, 12, 9, 0)));
        let due = queue.take_due(at(2025, 3, 12, 11, 0));
        assert_eq!(
            due,
            vec![(1, at(2025, 3, 12, 9, 0)), (3, at(2025, 3, 12, 11, 0))]
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_queue_cancel() {
        let mut queue = FireQueue::new();
        queue.schedule(1, at(2025, 3, 12, 9, 0));
        assert!(queue.cancel(1));
        assert!(!queue.cancel(1));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_one_off_retired_after_delivery() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        let reminder = db
            .create(5, "call mom", at(2025, 3, 12, 23, 30), Recurrence::None)
            .await
            .unwrap();
        scheduler.schedule(&reminder).await;

        // Not early
        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 23, 29)).await;
        assert!(summary.is_empty());
        assert!(gateway.texts().await.is_empty());

        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 23, 30)).await;
        assert_eq!(summary.retired, 1);
        assert_eq!(gateway.texts().await, vec![(5, "🔔 Reminder (23:30): call mom".to_string())]);
        assert!(db.get(reminder.id).await.unwrap().is_none());
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_overdue_daily_fires_once_and_skips_missed_days() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        // Bot was offline for eleven days
        let reminder = db
            .create(5, "water plants", at(2025, 3, 1, 9, 0), Recurrence::Daily)
            .await
            .unwrap();
        assert_eq!(scheduler.recover().await.unwrap(), 1);

        let now = at(2025, 3, 12, 10, 0);
        let summary = scheduler.poll_once(&gateway, now).await;
        assert_eq!(summary.rearmed, 1);
        assert_eq!(summary.delivered(), 1);
        for _ in 0..3 {
            assert!(scheduler.poll_once(&gateway, now).await.is_empty());
        }

        assert_eq!(
            gateway.texts().await,
            vec![(5, "🔔 Reminder (09:00): water plants".to_string())]
        );
        assert_eq!(
            db.get(reminder.id).await.unwrap().unwrap().fire_at,
            at(2025, 3, 13, 9, 0)
        );
        assert_eq!(
            scheduler.pending_due(reminder.id).await,
            Some(at(2025, 3, 13, 9, 0))
        );
    }

    #[tokio::test]
    async fn test_overdue_monthly_catch_up_keeps_clamped_day() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        let reminder = db
            .create(5, "rent", at(2025, 1, 31, 9, 0), Recurrence::Monthly)
            .await
            .unwrap();
        scheduler.schedule(&reminder).await;

        let summary = scheduler.poll_once(&gateway, at(2025, 3, 20, 12, 0)).await;
        assert_eq!(summary.rearmed, 1);
        assert_eq!(gateway.texts().await.len(), 1);
        assert_eq!(
            db.get(reminder.id).await.unwrap().unwrap().fire_at,
            at(2025, 3, 28, 9, 0)
        );
    }

    #[tokio::test]
    async fn test_monthly_rearm_clamps_and_keeps_single_event() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        let reminder = db
            .create(5, "rent", at(2025, 1, 31, 9, 0), Recurrence::Monthly)
            .await
            .unwrap();
        scheduler.schedule(&reminder).await;
        // Scheduling twice must not duplicate
        scheduler.schedule(&reminder).await;

        let summary = scheduler.poll_once(&gateway, at(2025, 1, 31, 9, 0)).await;
        assert_eq!(summary.rearmed, 1);
        assert_eq!(gateway.texts().await.len(), 1);

        let stored = db.get(reminder.id).await.unwrap().unwrap();
        assert_eq!(stored.fire_at, at(2025, 2, 28, 9, 0));
        assert_eq!(scheduler.pending_count().await, 1);
        assert_eq!(
            scheduler.pending_due(reminder.id).await,
            Some(at(2025, 2, 28, 9, 0))
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_next_poll() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        let reminder = db
            .create(5, "stretch", at(2025, 3, 12, 9, 0), Recurrence::Daily)
            .await
            .unwrap();
        scheduler.schedule(&reminder).await;

        gateway.fail_sends(true);
        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 9, 0)).await;
        assert_eq!(summary.deferred, 1);
        assert_eq!(
            scheduler.pending_due(reminder.id).await,
            Some(at(2025, 3, 12, 9, 0))
        );
        assert_eq!(
            db.get(reminder.id).await.unwrap().unwrap().fire_at,
            at(2025, 3, 12, 9, 0)
        );

        gateway.fail_sends(false);
        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 9, 1)).await;
        assert_eq!(summary.rearmed, 1);
        assert_eq!(
            db.get(reminder.id).await.unwrap().unwrap().fire_at,
            at(2025, 3, 13, 9, 0)
        );
    }

    #[tokio::test]
    async fn test_cancelled_reminder_dropped() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        let reminder = db
            .create(5, "gone", at(2025, 3, 12, 9, 0), Recurrence::None)
            .await
            .unwrap();
        scheduler.schedule(&reminder).await;
        db.delete(reminder.id).await.unwrap();

        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 10, 0)).await;
        assert_eq!(summary.dropped, 1);
        assert!(gateway.texts().await.is_empty());
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_store_is_source_of_truth_after_restart() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        // Created by a previous process, never scheduled in this one
        let reminder = db
            .create(5, "pills", at(2025, 3, 12, 8, 0), Recurrence::Weekly)
            .await
            .unwrap();

        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 8, 0)).await;
        assert_eq!(summary.rearmed, 1);
        assert_eq!(
            scheduler.pending_due(reminder.id).await,
            Some(at(2025, 3, 19, 8, 0))
        );
    }

    #[tokio::test]
    async fn test_recover_loads_pending() {
        let (scheduler, db) = scheduler_with_db().await;
        db.create(1, "a", at(2025, 3, 12, 8, 0), Recurrence::None).await.unwrap();
        db.create(2, "b", at(2025, 4, 1, 8, 0), Recurrence::Monthly).await.unwrap();

        assert_eq!(scheduler.recover().await.unwrap(), 2);
        assert_eq!(scheduler.pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_rescheduled_record_not_fired_early() {
        let (scheduler, db) = scheduler_with_db().await;
        let gateway = RecordingGateway::default();
        let reminder = db
            .create(5, "moved", at(2025, 3, 12, 9, 0), Recurrence::Daily)
            .await
            .unwrap();
        scheduler.schedule(&reminder).await;
        db.update(reminder.id, at(2025, 3, 13, 9, 0)).await.unwrap();

        let summary = scheduler.poll_once(&gateway, at(2025, 3, 12, 9, 0)).await;
        assert_eq!(summary.not_due, 1);
        assert!(gateway.texts().await.is_empty());
        assert_eq!(
            scheduler.pending_due(reminder.id).await,
            Some(at(2025, 3, 13, 9, 0))
        );
    }
}
