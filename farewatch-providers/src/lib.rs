pub mod http;
pub mod amadeus;
pub mod seats_aero;
pub mod dummy;
pub mod openai;

pub use amadeus::AmadeusProvider;
pub use dummy::DummyProvider;
pub use openai::OpenAiExtractor;
pub use seats_aero::SeatsAeroProvider;

use farewatch_core::{CoreError, CoreResult, SearchProvider};
use farewatch_store::Config;
use std::sync::Arc;
use tracing::info;

/// Build the search provider named by `search.provider`
pub fn build_search_provider(config: &Config) -> CoreResult<Arc<dyn SearchProvider>> {
    let provider: Arc<dyn SearchProvider> = match config.search.provider.as_str() {
        "amadeus" => Arc::new(AmadeusProvider::new(&config.amadeus, config.search.max_results)?),
        "seats_aero" | "seats.aero" => Arc::new(SeatsAeroProvider::new(&config.seats_aero)?),
        "dummy" => Arc::new(DummyProvider),
        other => {
            return Err(CoreError::ConfigError(format!("Unknown search provider: {}", other)));
        }
    };
    info!(provider = provider.name(), "Search provider ready");
    Ok(provider)
}
