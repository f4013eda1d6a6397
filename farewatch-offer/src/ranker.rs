use std::cmp::Ordering;
use tracing::debug;

use crate::features::EnrichedOffer;
use crate::preference::{Preference, SortBy};

/// Deterministic offer ranking for a fixed `Preference`
pub struct OfferRanker {
    preference: Preference,
}

impl OfferRanker {
    pub fn new(preference: Preference) -> Self {
        Self { preference }
    }

    /// Filter and order offers, best first.
    ///
    /// With `nonstop` set only zero-stop offers are kept, unless none exist, in which
    /// case the full set is ranked instead. The sort is stable, so offers that tie on
    /// every key keep their input order.
    pub fn rank<'o, 'a>(&self, offers: &'o [EnrichedOffer<'a>]) -> Vec<&'o EnrichedOffer<'a>> {
        let mut working: Vec<&EnrichedOffer<'a>> = offers.iter().collect();

        if self.preference.nonstop {
            let nonstop: Vec<&EnrichedOffer<'a>> = working.iter().copied().filter(|o| o.is_nonstop()).collect();
            if nonstop.is_empty() {
                debug!(candidates = offers.len(), "No nonstop offers, ranking the full set");
            } else {
                working = nonstop;
            }
        }

        working.sort_by(|a, b| self.compare(a, b));
        working
    }

    pub fn pick_best<'o, 'a>(&self, offers: &'o [EnrichedOffer<'a>]) -> Option<&'o EnrichedOffer<'a>> {
        self.rank(offers).into_iter().next()
    }

    fn compare(&self, a: &EnrichedOffer<'_>, b: &EnrichedOffer<'_>) -> Ordering {
        let by_price = || a.price.total_cmp(&b.price);
        match self.preference.sort_by {
            SortBy::Price => by_price().then_with(|| a.stops.cmp(&b.stops)),
            SortBy::Stops => a.stops.cmp(&b.stops).then_with(by_price),
            SortBy::EarliestArrival => latest_if_missing(a.arrival_ms())
                .cmp(&latest_if_missing(b.arrival_ms()))
                .then_with(by_price),
            SortBy::EarliestDeparture => latest_if_missing(a.departure_ms())
                .cmp(&latest_if_missing(b.departure_ms()))
                .then_with(by_price),
            SortBy::Duration => latest_if_missing(a.duration_ms())
                .cmp(&latest_if_missing(b.duration_ms()))
                .then_with(by_price),
        }
    }
}

fn latest_if_missing(value: Option<i64>) -> i64 {
    value.unwrap_or(i64::MAX)
}

pub fn rank<'o, 'a>(offers: &'o [EnrichedOffer<'a>], preference: &Preference) -> Vec<&'o EnrichedOffer<'a>> {
    OfferRanker::new(*preference).rank(offers)
}

pub fn pick_best<'o, 'a>(offers: &'o [EnrichedOffer<'a>], preference: &Preference) -> Option<&'o EnrichedOffer<'a>> {
    OfferRanker::new(*preference).pick_best(offers)
}
