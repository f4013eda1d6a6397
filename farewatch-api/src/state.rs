use farewatch_core::{QueryPlanner, SearchProvider};
use farewatch_monitor::{CycleHandler, MonitorScheduler};
use farewatch_store::{PlannedQueryStore, ResultCache, UserSettingsStore};
use std::sync::Arc;

use crate::notifier::BroadcastNotifier;
use crate::text::TextNormalizer;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<MonitorScheduler>,
    pub planner: Arc<QueryPlanner>,
    pub provider: Arc<dyn SearchProvider>,
    /// Shared by every user's monitor
    pub cycle: Arc<dyn CycleHandler>,
    pub cache: Arc<ResultCache>,
    pub settings: Arc<UserSettingsStore>,
    pub planned: Arc<PlannedQueryStore>,
    pub notifier: BroadcastNotifier,
    pub normalizer: Arc<TextNormalizer>,
    pub top_n: usize,
}
