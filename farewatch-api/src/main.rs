use anyhow::Context;
use farewatch_api::notifier::BroadcastNotifier;
use farewatch_api::text::TextNormalizer;
use farewatch_api::{app, AppState};
use farewatch_core::QueryPlanner;
use farewatch_monitor::{MonitorScheduler, SearchCycle};
use farewatch_providers::{build_search_provider, OpenAiExtractor};
use farewatch_store::{Config, PlannedQueryStore, ResultCache, UserSettings, UserSettingsStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "farewatch_api=debug,farewatch_monitor=debug,farewatch_providers=info,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Farewatch on port {}", config.server.port);

    let provider = build_search_provider(&config)?;
    let extractor = Arc::new(OpenAiExtractor::new(&config.llm)?);
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(config.search.cache_ttl_seconds),
        config.search.cache_max_entries,
    ));
    let notifier = BroadcastNotifier::default();
    let cycle = SearchCycle::new(provider.clone(), Arc::new(notifier.clone()))
        .with_cache(cache.clone())
        .with_top_n(config.monitor.top_n);
    let scheduler = Arc::new(MonitorScheduler::new());

    let state = AppState {
        scheduler: scheduler.clone(),
        planner: Arc::new(QueryPlanner::new(extractor)),
        provider,
        cycle: Arc::new(cycle),
        cache,
        settings: Arc::new(UserSettingsStore::new(UserSettings {
            provider: config.llm.provider.clone(),
            model: config.llm.model.clone(),
        })),
        planned: Arc::new(PlannedQueryStore::new()),
        notifier,
        normalizer: Arc::new(TextNormalizer::new()?),
        top_n: config.monitor.top_n,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stopped = scheduler.stop_all();
    tracing::info!(stopped, "Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
