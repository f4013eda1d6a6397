use async_trait::async_trait;
use farewatch_core::Notifier;
use farewatch_shared::models::events::UserNotification;
use tokio::sync::broadcast;
use tracing::debug;

pub const CHANNEL_CAPACITY: usize = 100;

/// Publishes cycle notifications to every live SSE subscriber; each stream filters by user.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<UserNotification>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<UserNotification>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserNotification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self::new(tx)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, notification: UserNotification) {
        let user_id = notification.user_id.clone();
        let task_id = notification.task_id;
        match self.tx.send(notification) {
            Ok(receivers) => debug!(%user_id, %task_id, receivers, "Notification published"),
            Err(_) => debug!(%user_id, %task_id, "Notification dropped, nobody is listening"),
        }
    }
}
