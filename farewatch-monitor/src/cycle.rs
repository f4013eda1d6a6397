use async_trait::async_trait;
use farewatch_core::{Notifier, SearchProvider};
use farewatch_offer::format::{format_results, FormatOptions, DEFAULT_TOP_N};
use farewatch_offer::{enrich, pick_best, Verdict};
use farewatch_shared::models::events::{NotificationKind, UserNotification};
use farewatch_store::ResultCache;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::scheduler::{CycleHandler, MonitorTask};

/// Search, rank, compare against the baseline, and notify when the result is worth reporting
pub struct SearchCycle {
    provider: Arc<dyn SearchProvider>,
    notifier: Arc<dyn Notifier>,
    cache: Option<Arc<ResultCache>>,
    top_n: usize,
}

impl SearchCycle {
    pub fn new(provider: Arc<dyn SearchProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self { provider, notifier, cache: None, top_n: DEFAULT_TOP_N }
    }

    /// Fresh results also refresh the shared result cache
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }
}

fn interval_label(task: &MonitorTask) -> String {
    let secs = task.interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("every {} min", secs / 60)
    } else {
        format!("every {:.1} s", task.interval.as_secs_f64())
    }
}

#[async_trait]
impl CycleHandler for SearchCycle {
    async fn run_cycle(&self, task: &mut MonitorTask) {
        // Always a live call; the cache only serves interactive searches
        let offers = match self.provider.search(&task.query).await {
            Ok(offers) => offers,
            Err(e) => {
                warn!(
                    user_id = %task.user_id,
                    task_id = %task.task_id,
                    provider = self.provider.name(),
                    error = %e,
                    "Monitor search failed, keeping baseline"
                );
                return;
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(task.query.cache_key(self.provider.name()), offers.clone());
        }

        let enriched = enrich(&offers);
        let best = pick_best(&enriched, &task.preference);
        let verdict = task.baseline.observe(best, &task.preference);

        let (kind, headline) = match verdict {
            Verdict::First => (
                NotificationKind::FirstResult,
                format!("🆕 First results (monitoring {}):", interval_label(task)),
            ),
            Verdict::Improved => (NotificationKind::Improved, "✅ Found a better match for your preference:".to_string()),
            Verdict::Unchanged => {
                debug!(user_id = %task.user_id, task_id = %task.task_id, count = offers.len(), "No better offer this cycle");
                return;
            }
        };

        info!(
            user_id = %task.user_id,
            task_id = %task.task_id,
            verdict = ?verdict,
            score = ?task.baseline.score,
            "Reporting monitor result"
        );

        let body = format_results(&task.query, &offers, &task.preference, FormatOptions { top_n: self.top_n, cache_hit: false });
        let text = format!("{}\n{}", headline, body);
        self.notifier
            .notify(UserNotification::new(&task.user_id, task.task_id, kind, text))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use farewatch_core::{CoreError, CoreResult, Offer, OfferPrice, Query, Segment};
    use farewatch_offer::{Baseline, Preference};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;
    use uuid::Uuid;

    /// Replays one scripted response per call
    struct ScriptedProvider {
        responses: Mutex<VecDeque<CoreResult<Vec<Offer>>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<CoreResult<Vec<Offer>>>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()) })
        }
    }

    #[async_trait]
    impl SearchProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn search(&self, _query: &Query) -> CoreResult<Vec<Offer>> {
            self.responses.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct CollectingNotifier {
        sent: Mutex<Vec<UserNotification>>,
    }

    #[async_trait]
    impl Notifier for CollectingNotifier {
        async fn notify(&self, notification: UserNotification) {
            self.sent.lock().push(notification);
        }
    }

    fn query() -> Query {
        Query::new("SFO", "HND", NaiveDate::from_ymd_opt(2026, 3, 4).unwrap())
    }

    fn task() -> MonitorTask {
        MonitorTask {
            task_id: Uuid::new_v4(),
            user_id: "u1".into(),
            query: query(),
            preference: Preference::default(),
            interval: Duration::from_secs(180),
            baseline: Baseline::default(),
        }
    }

    fn offer(price: f64) -> Offer {
        Offer::new(
            "scripted",
            OfferPrice::Cash { amount: Some(price), currency: "USD".into() },
            vec![Segment {
                origin: "SFO".into(),
                destination: "HND".into(),
                departs_at: Some("2026-03-04T10:30:00".into()),
                arrives_at: Some("2026-03-05T14:20:00".into()),
                carrier: Some("NH".into()),
                ..Default::default()
            }],
        )
    }

    #[tokio::test]
    async fn test_cycle_reports_first_then_only_improvements() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![offer(2100.0)]),
            Ok(vec![offer(2100.0)]),
            Ok(vec![offer(2300.0)]),
            Ok(vec![offer(1900.0), offer(2500.0)]),
        ]);
        let notifier = Arc::new(CollectingNotifier::default());
        let cycle = SearchCycle::new(provider, notifier.clone());
        let mut task = task();

        for _ in 0..4 {
            cycle.run_cycle(&mut task).await;
        }

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind, NotificationKind::FirstResult);
        assert!(sent[0].text.starts_with("🆕 First results (monitoring every 3 min):"));
        assert!(sent[0].text.contains("USD 2100"));
        assert_eq!(sent[1].kind, NotificationKind::Improved);
        assert!(sent[1].text.contains("1. SFO→HND | nonstop | 03-04 10:30→03-05 14:20 | NH | USD 1900"));
        assert_eq!(sent[1].task_id, task.task_id);
        assert_eq!(task.baseline.score, Some(1900.0));
    }

    #[tokio::test]
    async fn test_failed_search_leaves_baseline_untouched() {
        let provider = ScriptedProvider::new(vec![
            Err(CoreError::UpstreamError("HTTP 503".into())),
            Ok(vec![offer(2100.0)]),
        ]);
        let notifier = Arc::new(CollectingNotifier::default());
        let cycle = SearchCycle::new(provider, notifier.clone());
        let mut task = task();

        cycle.run_cycle(&mut task).await;
        assert!(!task.baseline.first_cycle_done);
        assert!(notifier.sent.lock().is_empty());

        // the next cycle is still the first completed one
        cycle.run_cycle(&mut task).await;
        assert_eq!(notifier.sent.lock()[0].kind, NotificationKind::FirstResult);
    }

    #[tokio::test]
    async fn test_empty_first_cycle_is_reported() {
        let provider = ScriptedProvider::new(vec![Ok(Vec::new()), Ok(Vec::new())]);
        let notifier = Arc::new(CollectingNotifier::default());
        let cycle = SearchCycle::new(provider, notifier.clone());
        let mut task = task();

        cycle.run_cycle(&mut task).await;
        cycle.run_cycle(&mut task).await;

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.ends_with("No results found."));
    }

    #[tokio::test]
    async fn test_cycle_refreshes_cache() {
        let provider = ScriptedProvider::new(vec![Ok(vec![offer(2100.0)])]);
        let cache = Arc::new(ResultCache::default());
        let cycle = SearchCycle::new(provider, Arc::new(CollectingNotifier::default())).with_cache(cache.clone());
        let mut task = task();

        cycle.run_cycle(&mut task).await;
        let cached = cache.get(&task.query.cache_key("scripted")).unwrap();
        assert_eq!(cached.len(), 1);
    }
}
