use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

pub const MAX_PASSENGERS: u8 = 9;
pub const MAX_FLEXIBLE_DAYS: u8 = 7;

/// Cabin class requested by the traveller
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Cabin {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl Cabin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cabin::Economy => "economy",
            Cabin::PremiumEconomy => "premium_economy",
            Cabin::Business => "business",
            Cabin::First => "first",
        }
    }
}

impl fmt::Display for Cabin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cabin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(Cabin::Economy),
            "premium_economy" => Ok(Cabin::PremiumEconomy),
            "business" => Ok(Cabin::Business),
            "first" => Ok(Cabin::First),
            other => Err(CoreError::ValidationError(format!("unknown cabin: {}", other))),
        }
    }
}

/// An itinerary request. Built once by query planning and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
    pub passengers: u8,
    pub cabin: Cabin,
    pub nonstop: bool,
    pub flexible_days: u8,
}

impl Query {
    pub fn new(from: impl Into<String>, to: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            date,
            passengers: 1,
            cabin: Cabin::default(),
            nonstop: false,
            flexible_days: 0,
        }
    }

    /// Composite key used by the manual-query result cache
    pub fn cache_key(&self, source: &str) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            source, self.from, self.to, self.date, self.cabin, self.passengers, self.nonstop
        )
    }

    /// Validate loosely-typed extractor output into a `Query`.
    ///
    /// Integer fields accept numbers, numeric strings and booleans; `nonstop`
    /// accepts booleans and the string "true". Missing optional fields take
    /// their defaults. On failure the names of every invalid field are returned.
    pub fn from_value(value: &Value) -> Result<Self, Vec<&'static str>> {
        let mut invalid = Vec::new();

        let from = airport_code(value.get("from"));
        if from.is_none() {
            invalid.push("from");
        }
        let to = airport_code(value.get("to"));
        if to.is_none() {
            invalid.push("to");
        }

        let date = value
            .get("date")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        if date.is_none() {
            invalid.push("date");
        }

        let passengers = match present(value.get("passengers")) {
            None => Some(1),
            Some(v) => coerce_int(v)
                .filter(|n| (1..=MAX_PASSENGERS as i64).contains(n))
                .map(|n| n as u8),
        };
        if passengers.is_none() {
            invalid.push("passengers");
        }

        let cabin = match present(value.get("cabin")) {
            None => Some(Cabin::default()),
            Some(v) => v.as_str().and_then(|s| s.parse().ok()),
        };
        if cabin.is_none() {
            invalid.push("cabin");
        }

        let nonstop = match present(value.get("nonstop")) {
            None => Some(false),
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) => Some(s.trim().eq_ignore_ascii_case("true")),
            Some(_) => None,
        };
        if nonstop.is_none() {
            invalid.push("nonstop");
        }

        let flexible = present(value.get("flexibleDays")).or_else(|| present(value.get("flexible_days")));
        let flexible_days = match flexible {
            None => Some(0),
            Some(v) => coerce_int(v)
                .filter(|n| (0..=MAX_FLEXIBLE_DAYS as i64).contains(n))
                .map(|n| n as u8),
        };
        if flexible_days.is_none() {
            invalid.push("flexibleDays");
        }

        match (from, to, date, passengers, cabin, nonstop, flexible_days) {
            (Some(from), Some(to), Some(date), Some(passengers), Some(cabin), Some(nonstop), Some(flexible_days)) => {
                Ok(Self { from, to, date, passengers, cabin, nonstop, flexible_days })
            }
            _ => Err(invalid),
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn airport_code(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.chars().count() >= 2)
        .map(str::to_uppercase)
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(*b as i64),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => leading_int(s),
        _ => None,
    }
}

/// Integer prefix of `s` after optional whitespace and sign, so `"2 adults"` reads as 2
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let magnitude: i64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// One flight leg. Timestamps are kept as the provider sent them; enrichment parses them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub origin: String,
    pub destination: String,
    pub departs_at: Option<String>,
    pub arrives_at: Option<String>,
    pub carrier: Option<String>,
    pub flight_number: Option<String>,
    pub cabin: Option<Cabin>,
}

/// How an offer is paid for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfferPrice {
    Cash {
        amount: Option<f64>,
        currency: String,
    },
    Points {
        points: Option<u64>,
        taxes: Option<f64>,
        program: String,
    },
}

impl OfferPrice {
    /// The headline number: cash total or points cost
    pub fn headline(&self) -> Option<f64> {
        match self {
            OfferPrice::Cash { amount, .. } => amount.filter(|a| a.is_finite()),
            OfferPrice::Points { points, .. } => points.map(|p| p as f64),
        }
    }

    /// Price used for ranking; unknown prices sort last.
    pub fn comparable(&self) -> f64 {
        self.headline().unwrap_or(f64::INFINITY)
    }

    pub fn currency(&self) -> Option<&str> {
        match self {
            OfferPrice::Cash { currency, .. } => Some(currency),
            OfferPrice::Points { .. } => None,
        }
    }
}

/// A priced itinerary returned by a search provider. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub summary: String,
    pub price: OfferPrice,
    pub segments: Vec<Segment>,
    pub source: String,
    pub deep_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Offer {
    pub fn new(source: impl Into<String>, price: OfferPrice, segments: Vec<Segment>) -> Self {
        let summary = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => format!("{}→{}", first.origin, last.destination),
            _ => "Offer".to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            summary,
            price,
            segments,
            source: source.into(),
            deep_link: None,
            raw: None,
        }
    }

    pub fn with_deep_link(mut self, link: Option<String>) -> Self {
        self.deep_link = link;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_from_value_applies_defaults() {
        let q = Query::from_value(&json!({"from": "sfo", "to": "HND", "date": "2026-03-04"})).expect("valid");
        assert_eq!(q.from, "SFO");
        assert_eq!(q.passengers, 1);
        assert_eq!(q.cabin, Cabin::Economy);
        assert!(!q.nonstop);
        assert_eq!(q.flexible_days, 0);
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
    }

    #[test]
    fn test_query_from_value_coerces_loose_types() {
        let q = Query::from_value(&json!({
            "from": "SFO", "to": "HND", "date": "2026-03-04",
            "passengers": "2", "cabin": "business", "nonstop": "TRUE", "flexibleDays": true
        }))
        .expect("valid");
        assert_eq!(q.passengers, 2);
        assert_eq!(q.cabin, Cabin::Business);
        assert!(q.nonstop);
        assert_eq!(q.flexible_days, 1);
    }

    #[test]
    fn test_query_from_value_reads_leading_digits() {
        let q = Query::from_value(&json!({
            "from": "SFO", "to": "HND", "date": "2026-03-04",
            "passengers": "2 adults", "flexibleDays": " 3days"
        }))
        .expect("valid");
        assert_eq!(q.passengers, 2);
        assert_eq!(q.flexible_days, 3);

        let err = Query::from_value(&json!({"from": "SFO", "to": "HND", "date": "2026-03-04", "passengers": "two"}))
            .unwrap_err();
        assert_eq!(err, vec!["passengers"]);
        assert_eq!(leading_int("-1 child"), Some(-1));
        assert_eq!(leading_int("2.5"), Some(2));
        assert_eq!(leading_int("+"), None);
    }

    #[test]
    fn test_query_from_value_reports_every_invalid_field() {
        let err = Query::from_value(&json!({"from": "S", "date": "next week", "passengers": 12, "cabin": "sofa"}))
            .unwrap_err();
        assert_eq!(err, vec!["from", "to", "date", "passengers", "cabin"]);
    }

    #[test]
    fn test_cache_key_covers_query_fields() {
        let mut q = Query::new("SFO", "HND", NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        q.passengers = 2;
        q.cabin = Cabin::Business;
        assert_eq!(q.cache_key("amadeus"), "amadeus|SFO|HND|2026-03-04|business|2|false");
    }

    #[test]
    fn test_comparable_price() {
        let cash = OfferPrice::Cash { amount: Some(2100.0), currency: "USD".into() };
        let missing = OfferPrice::Cash { amount: None, currency: "USD".into() };
        let points = OfferPrice::Points { points: Some(75000), taxes: Some(56.0), program: "X".into() };
        assert_eq!(cash.comparable(), 2100.0);
        assert!(missing.comparable().is_infinite());
        assert_eq!(points.comparable(), 75000.0);
        assert_eq!(points.currency(), None);
    }

    #[test]
    fn test_offer_summary_uses_route() {
        let seg = |o: &str, d: &str| Segment { origin: o.into(), destination: d.into(), ..Default::default() };
        let offer = Offer::new(
            "test",
            OfferPrice::Cash { amount: Some(1.0), currency: "USD".into() },
            vec![seg("SFO", "ICN"), seg("ICN", "HND")],
        );
        assert_eq!(offer.summary, "SFO→HND");
        assert_eq!(Offer::new("test", offer.price.clone(), vec![]).summary, "Offer");
    }
}
