pub mod search;
pub mod supplier;
pub mod planner;

pub use search::{Cabin, Offer, OfferPrice, Query, Segment};
pub use supplier::{Notifier, QueryExtractor, SearchProvider};
pub use planner::{PlanOutcome, QueryPlanner};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Upstream request failed: {0}")]
    UpstreamError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
