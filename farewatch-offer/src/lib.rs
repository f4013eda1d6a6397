pub mod features;
pub mod preference;
pub mod ranker;
pub mod change;
pub mod format;

pub use features::{enrich, EnrichedOffer};
pub use preference::{infer_preference, Preference, PreferenceEngine, SortBy};
pub use ranker::{pick_best, rank, OfferRanker};
pub use change::{fingerprint, score, Baseline, Fingerprint, Verdict};
pub use format::{format_results, FormatOptions};
