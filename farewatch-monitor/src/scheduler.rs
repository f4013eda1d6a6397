use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farewatch_core::Query;
use farewatch_offer::{Baseline, Preference};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// State of one user's monitoring task, handed to the cycle handler on every eligible tick
#[derive(Debug, Clone)]
pub struct MonitorTask {
    pub task_id: Uuid,
    pub user_id: String,
    pub query: Query,
    pub preference: Preference,
    pub interval: Duration,
    pub baseline: Baseline,
}

/// Read-only snapshot of a running task
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub task_id: Uuid,
    pub interval: Duration,
    pub query: Query,
    pub preference: Preference,
    pub started_at: DateTime<Utc>,
}

/// One monitoring cycle. Implementations may mutate the task's baseline; nothing else reads it concurrently.
#[async_trait]
pub trait CycleHandler: Send + Sync {
    async fn run_cycle(&self, task: &mut MonitorTask);
}

/// Per-task cycle slot. `in_flight` is the only cross-cycle synchronisation.
struct CycleSlot {
    in_flight: AtomicBool,
    state: Mutex<Option<MonitorTask>>,
}

/// Exclusive right to run one cycle. Dropping it returns the task state and reopens the slot.
struct CycleGuard {
    slot: Arc<CycleSlot>,
    task: Option<MonitorTask>,
}

impl CycleGuard {
    fn acquire(slot: &Arc<CycleSlot>) -> Option<Self> {
        slot.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let Some(task) = slot.state.lock().take() else {
            slot.in_flight.store(false, Ordering::Release);
            return None;
        };
        Some(Self { slot: Arc::clone(slot), task: Some(task) })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            *self.slot.state.lock() = Some(task);
        }
        self.slot.in_flight.store(false, Ordering::Release);
    }
}

struct MonitorEntry {
    status: TaskStatus,
    driver: JoinHandle<()>,
}

impl Drop for MonitorEntry {
    fn drop(&mut self) {
        // A cycle already spawned keeps running to completion
        self.driver.abort();
    }
}

/// Registry of recurring monitoring tasks, at most one per user
#[derive(Default)]
pub struct MonitorScheduler {
    tasks: Mutex<HashMap<String, MonitorEntry>>,
}

impl MonitorScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start monitoring for `user_id`, replacing any task it already has.
    ///
    /// The first cycle runs immediately; later cycles follow every `interval`. A tick that
    /// arrives while the previous cycle is still running is skipped.
    pub fn start(
        &self,
        user_id: &str,
        interval: Duration,
        query: Query,
        preference: Preference,
        handler: Arc<dyn CycleHandler>,
    ) -> TaskStatus {
        let interval = interval.max(MIN_INTERVAL);
        let task = MonitorTask {
            task_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            query,
            preference,
            interval,
            baseline: Baseline::default(),
        };
        let status = TaskStatus {
            task_id: task.task_id,
            interval,
            query: task.query.clone(),
            preference,
            started_at: Utc::now(),
        };

        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.remove(user_id) {
            info!(user_id, task_id = %previous.status.task_id, "Replacing running monitor");
        }

        let slot = Arc::new(CycleSlot { in_flight: AtomicBool::new(false), state: Mutex::new(Some(task)) });
        let driver = tokio::spawn(drive(slot, handler, interval, user_id.to_string()));

        info!(
            user_id,
            task_id = %status.task_id,
            interval_ms = millis(interval),
            from = %status.query.from,
            to = %status.query.to,
            "Monitor started"
        );
        tasks.insert(user_id.to_string(), MonitorEntry { status: status.clone(), driver });
        status
    }

    /// Stop the user's task. Returns `false` when nothing was running.
    pub fn stop(&self, user_id: &str) -> bool {
        match self.tasks.lock().remove(user_id) {
            Some(entry) => {
                info!(user_id, task_id = %entry.status.task_id, "Monitor stopped");
                true
            }
            None => {
                debug!(user_id, "Stop requested but no monitor is running");
                false
            }
        }
    }

    pub fn status(&self, user_id: &str) -> Option<TaskStatus> {
        self.tasks.lock().get(user_id).map(|entry| entry.status.clone())
    }

    pub fn is_running(&self, user_id: &str) -> bool {
        self.tasks.lock().contains_key(user_id)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Stop every task, e.g. on shutdown. Returns how many were running.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<MonitorEntry> = self.tasks.lock().drain().map(|(_, entry)| entry).collect();
        let count = drained.len();
        drop(drained);
        if count > 0 {
            info!(count, "All monitors stopped");
        }
        count
    }
}

fn millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

async fn drive(slot: Arc<CycleSlot>, handler: Arc<dyn CycleHandler>, interval: Duration, user_id: String) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // first tick completes immediately
        ticker.tick().await;

        match CycleGuard::acquire(&slot) {
            Some(mut guard) => {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Some(task) = guard.task.as_mut() {
                        handler.run_cycle(task).await;
                    }
                });
            }
            None => debug!(user_id = %user_id, "Previous cycle still running, skipping tick"),
        }
    }
}
