use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use farewatch_core::Offer;

/// Stop count given to offers that carry no segments at all
pub const UNKNOWN_STOPS: usize = 999;

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Comparable view of an `Offer`, rebuilt on every ranking pass
#[derive(Debug, Clone)]
pub struct EnrichedOffer<'a> {
    pub offer: &'a Offer,
    pub route: String,
    pub stops: usize,
    pub carriers: String,
    pub departs_at: Option<DateTime<Utc>>,
    pub arrives_at: Option<DateTime<Utc>>,
    pub price: f64,
}

impl EnrichedOffer<'_> {
    pub fn departure_ms(&self) -> Option<i64> {
        self.departs_at.map(|t| t.timestamp_millis())
    }

    pub fn arrival_ms(&self) -> Option<i64> {
        self.arrives_at.map(|t| t.timestamp_millis())
    }

    /// Total trip time in milliseconds; `None` when either end is unknown
    pub fn duration_ms(&self) -> Option<i64> {
        Some(self.arrival_ms()? - self.departure_ms()?)
    }

    pub fn is_nonstop(&self) -> bool {
        self.stops == 0
    }
}

/// Derive ranking fields for every offer. Never fails: bad data turns into worst-case sentinels.
pub fn enrich(offers: &[Offer]) -> Vec<EnrichedOffer<'_>> {
    offers.iter().map(enrich_one).collect()
}

fn enrich_one(offer: &Offer) -> EnrichedOffer<'_> {
    let price = offer.price.comparable();
    let (first, last) = match (offer.segments.first(), offer.segments.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return EnrichedOffer {
                offer,
                route: "N/A".to_string(),
                stops: UNKNOWN_STOPS,
                carriers: "N/A".to_string(),
                departs_at: None,
                arrives_at: None,
                price,
            }
        }
    };

    let mut carriers: Vec<&str> = Vec::new();
    for carrier in offer.segments.iter().filter_map(|s| s.carrier.as_deref()) {
        if !carrier.is_empty() && !carriers.contains(&carrier) {
            carriers.push(carrier);
        }
    }

    EnrichedOffer {
        offer,
        route: format!("{}→{}", first.origin, last.destination),
        stops: offer.segments.len() - 1,
        carriers: if carriers.is_empty() { "N/A".to_string() } else { carriers.join("/") },
        departs_at: first.departs_at.as_deref().and_then(parse_instant),
        arrives_at: last.arrives_at.as_deref().and_then(parse_instant),
        price,
    }
}

/// Parse provider timestamps. Offsets are honoured; local times and bare dates are read as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use farewatch_core::{OfferPrice, Segment};

    fn leg(from: &str, to: &str, dep: &str, arr: &str, carrier: &str) -> Segment {
        Segment {
            origin: from.into(),
            destination: to.into(),
            departs_at: Some(dep.into()),
            arrives_at: Some(arr.into()),
            carrier: Some(carrier.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_enrich_multi_leg_offer() {
        let offers = vec![Offer::new(
            "test",
            OfferPrice::Cash { amount: Some(980.5), currency: "USD".into() },
            vec![
                leg("SFO", "ICN", "2026-03-04T10:00:00", "2026-03-05T15:00:00", "KE"),
                leg("ICN", "HND", "2026-03-05T17:00:00", "2026-03-05T19:30:00", "KE"),
            ],
        )];

        let enriched = enrich(&offers);
        let e = &enriched[0];
        assert_eq!(e.route, "SFO→HND");
        assert_eq!(e.stops, 1);
        assert_eq!(e.carriers, "KE");
        assert_eq!(e.price, 980.5);
        assert_eq!(e.duration_ms(), Some((33 * 60 + 30) * 60 * 1000));
    }

    #[test]
    fn test_enrich_degrades_bad_data() {
        let offers = vec![
            Offer::new("test", OfferPrice::Cash { amount: None, currency: "USD".into() }, vec![]),
            Offer::new(
                "test",
                OfferPrice::Cash { amount: Some(1.0), currency: "USD".into() },
                vec![leg("SFO", "HND", "soon", "2026-03-05T19:30:00+09:00", "")],
            ),
        ];

        let enriched = enrich(&offers);
        assert_eq!(enriched[0].stops, UNKNOWN_STOPS);
        assert_eq!(enriched[0].route, "N/A");
        assert!(enriched[0].price.is_infinite());
        assert_eq!(enriched[0].duration_ms(), None);

        assert_eq!(enriched[1].departs_at, None);
        assert!(enriched[1].arrives_at.is_some());
        assert_eq!(enriched[1].duration_ms(), None);
        assert_eq!(enriched[1].carriers, "N/A");
    }

    #[test]
    fn test_parse_instant_formats() {
        let utc = parse_instant("2026-03-04T10:30:00Z").unwrap();
        assert_eq!(parse_instant("2026-03-04T19:30:00+09:00"), Some(utc));
        assert_eq!(parse_instant("2026-03-04T10:30:00"), Some(utc));
        assert_eq!(parse_instant("2026-03-04T10:30"), Some(utc));
        assert_eq!(parse_instant("2026-03-04").unwrap().timestamp() % 86_400, 0);
        assert_eq!(parse_instant(""), None);
    }

    #[test]
    fn test_enrich_empty() {
        assert!(enrich(&[]).is_empty());
    }
}
