use async_trait::async_trait;
use farewatch_shared::models::events::UserNotification;

use crate::search::{Offer, Query};
use crate::CoreResult;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short identifier used in logs and cache keys
    fn name(&self) -> &str;

    /// Run a live search. Any error means this call produced no usable data.
    async fn search(&self, query: &Query) -> CoreResult<Vec<Offer>>;
}

#[async_trait]
pub trait QueryExtractor: Send + Sync {
    /// Turn free text into a JSON document describing a `Query`. Returns the raw reply text.
    async fn extract(&self, text: &str, model: &str) -> CoreResult<String>;
}

/// Best-effort delivery of a message to `notification.user_id`. Implementations log their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: UserNotification);
}
