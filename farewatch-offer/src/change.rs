use serde::Serialize;
use std::fmt;

use crate::features::EnrichedOffer;
use crate::preference::{Preference, SortBy};

/// Weight that makes stop count dominate price in the `stops` score
pub const STOPS_WEIGHT: f64 = 1e9;

/// Identity of an observed deal. Equal fingerprints mean "the same deal", whichever call produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct FingerprintFields<'a> {
    price: Option<f64>,
    currency: Option<&'a str>,
    from: Option<&'a str>,
    to: Option<&'a str>,
    departs_at: Option<&'a str>,
    arrives_at: Option<&'a str>,
    stops: usize,
}

pub fn fingerprint(best: Option<&EnrichedOffer<'_>>) -> Option<Fingerprint> {
    let best = best?;
    let offer = best.offer;
    let first = offer.segments.first();
    let last = offer.segments.last();

    let fields = FingerprintFields {
        price: offer.price.headline(),
        currency: offer.price.currency(),
        from: first.map(|s| s.origin.as_str()),
        to: last.map(|s| s.destination.as_str()),
        departs_at: first.and_then(|s| s.departs_at.as_deref()),
        arrives_at: last.and_then(|s| s.arrives_at.as_deref()),
        stops: best.stops,
    };
    serde_json::to_string(&fields).ok().map(Fingerprint)
}

/// How well `best` satisfies `preference`; lower is better, absent is worst.
pub fn score(best: Option<&EnrichedOffer<'_>>, preference: &Preference) -> f64 {
    let Some(best) = best else {
        return f64::INFINITY;
    };
    let or_infinite = |ms: Option<i64>| ms.map(|v| v as f64).unwrap_or(f64::INFINITY);

    match preference.sort_by {
        SortBy::Stops => best.stops as f64 * STOPS_WEIGHT + best.price,
        SortBy::EarliestArrival => or_infinite(best.arrival_ms()),
        SortBy::EarliestDeparture => or_infinite(best.departure_ms()),
        SortBy::Duration => or_infinite(best.duration_ms()),
        SortBy::Price => best.price,
    }
}

/// Outcome of comparing a cycle's best offer against the task's baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First completed cycle; always reported
    First,
    /// Different deal with a strictly better score
    Improved,
    /// Nothing worth telling the user
    Unchanged,
}

impl Verdict {
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Verdict::Unchanged)
    }
}

/// A later cycle is reportable only when the score strictly improves and the deal itself changed.
pub fn is_reportable(
    previous_score: Option<f64>,
    previous_fingerprint: Option<&Fingerprint>,
    new_score: f64,
    new_fingerprint: Option<&Fingerprint>,
) -> bool {
    let improved = previous_score.map_or(true, |prev| new_score < prev);
    improved && new_fingerprint != previous_fingerprint
}

/// Last reported fingerprint and score of a monitoring task
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pub fingerprint: Option<Fingerprint>,
    pub score: Option<f64>,
    pub first_cycle_done: bool,
}

impl Baseline {
    /// Compare `best` against the baseline, moving the baseline forward whenever the result is reported.
    pub fn observe(&mut self, best: Option<&EnrichedOffer<'_>>, preference: &Preference) -> Verdict {
        let new_fingerprint = fingerprint(best);
        let new_score = score(best, preference);

        if !self.first_cycle_done {
            self.first_cycle_done = true;
            self.fingerprint = new_fingerprint;
            self.score = Some(new_score);
            return Verdict::First;
        }

        if is_reportable(self.score, self.fingerprint.as_ref(), new_score, new_fingerprint.as_ref()) {
            self.fingerprint = new_fingerprint;
            self.score = Some(new_score);
            Verdict::Improved
        } else {
            Verdict::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::enrich;
    use farewatch_core::{Offer, OfferPrice, Segment};

    fn offer(price: f64, to: &str, dep: &str) -> Offer {
        Offer::new(
            "test",
            OfferPrice::Cash { amount: Some(price), currency: "USD".into() },
            vec![Segment {
                origin: "SFO".into(),
                destination: to.into(),
                departs_at: Some(dep.into()),
                arrives_at: Some("2026-03-05T15:00:00".into()),
                ..Default::default()
            }],
        )
    }

    fn fp(o: &Offer) -> Fingerprint {
        let enriched = enrich(std::slice::from_ref(o));
        fingerprint(enriched.first()).unwrap()
    }

    #[test]
    fn test_fingerprint_ignores_offer_identity() {
        let a = offer(2100.0, "HND", "2026-03-04T10:00:00");
        let b = offer(2100.0, "HND", "2026-03-04T10:00:00");
        assert_ne!(a.id, b.id);
        assert_eq!(fp(&a), fp(&b));
        assert_ne!(fp(&a), fp(&offer(2100.0, "NRT", "2026-03-04T10:00:00")));
        assert_eq!(fingerprint(None), None);
    }

    #[test]
    fn test_score_per_preference() {
        let offers = vec![offer(2100.0, "HND", "2026-03-04T10:00:00")];
        let enriched = enrich(&offers);
        let best = enriched.first();
        let p = |sort_by| Preference { sort_by, nonstop: false };

        assert_eq!(score(best, &p(SortBy::Price)), 2100.0);
        assert_eq!(score(best, &p(SortBy::Stops)), 2100.0);
        assert_eq!(score(best, &p(SortBy::Duration)), (29 * 3600 * 1000) as f64);
        assert_eq!(score(best, &p(SortBy::EarliestDeparture)), enriched[0].departure_ms().unwrap() as f64);
        assert!(score(None, &p(SortBy::Price)).is_infinite());
    }

    #[test]
    fn test_stops_dominate_price() {
        let mut two_legs = offer(100.0, "ICN", "2026-03-04T10:00:00");
        two_legs.segments.push(Segment { origin: "ICN".into(), destination: "HND".into(), ..Default::default() });
        let offers = vec![two_legs, offer(5000.0, "HND", "2026-03-04T10:00:00")];
        let enriched = enrich(&offers);
        let p = Preference { sort_by: SortBy::Stops, nonstop: false };
        assert!(score(enriched.get(1), &p) < score(enriched.first(), &p));
    }

    #[test]
    fn test_reportability_rule() {
        let f = fp(&offer(2100.0, "HND", "2026-03-04T10:00:00"));
        let g = fp(&offer(2000.0, "HND", "2026-03-04T10:00:00"));

        // same score, same deal
        assert!(!is_reportable(Some(2100.0), Some(&f), 2100.0, Some(&f)));
        // better score, same deal
        assert!(!is_reportable(Some(2100.0), Some(&f), 2000.0, Some(&f)));
        // different deal, not better
        assert!(!is_reportable(Some(2000.0), Some(&g), 2000.0, Some(&f)));
        assert!(!is_reportable(Some(2000.0), Some(&g), 2100.0, Some(&f)));
        // different deal, strictly better
        assert!(is_reportable(Some(2100.0), Some(&f), 2000.0, Some(&g)));
        // no previous score
        assert!(is_reportable(None, Some(&f), 2100.0, Some(&g)));
    }

    #[test]
    fn test_first_cycle_always_reported_even_when_empty() {
        let mut baseline = Baseline::default();
        let pref = Preference::default();

        assert_eq!(baseline.observe(None, &pref), Verdict::First);
        assert!(baseline.first_cycle_done);
        assert_eq!(baseline.fingerprint, None);
        assert_eq!(baseline.score, Some(f64::INFINITY));

        // Still empty: not reportable
        assert_eq!(baseline.observe(None, &pref), Verdict::Unchanged);

        // Any real offer beats an empty baseline
        let offers = vec![offer(2100.0, "HND", "2026-03-04T10:00:00")];
        let enriched = enrich(&offers);
        assert_eq!(baseline.observe(enriched.first(), &pref), Verdict::Improved);
        assert_eq!(baseline.score, Some(2100.0));
    }

    #[test]
    fn test_baseline_moves_only_on_report() {
        let pref = Preference::default();
        let first = vec![offer(2100.0, "HND", "2026-03-04T10:00:00")];
        let worse = vec![offer(2300.0, "NRT", "2026-03-04T11:00:00")];
        let better = vec![offer(1900.0, "NRT", "2026-03-04T11:00:00")];

        let mut baseline = Baseline::default();
        assert_eq!(baseline.observe(enrich(&first).first(), &pref), Verdict::First);
        assert_eq!(baseline.observe(enrich(&first).first(), &pref), Verdict::Unchanged);
        assert_eq!(baseline.observe(enrich(&worse).first(), &pref), Verdict::Unchanged);
        assert_eq!(baseline.score, Some(2100.0));
        assert_eq!(baseline.observe(enrich(&better).first(), &pref), Verdict::Improved);
        assert_eq!(baseline.observe(enrich(&better).first(), &pref), Verdict::Unchanged);
        assert!(Verdict::Improved.is_reportable());
    }
}
