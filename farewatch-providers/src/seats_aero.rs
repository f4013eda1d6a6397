use async_trait::async_trait;
use farewatch_core::{Cabin, CoreError, CoreResult, Offer, OfferPrice, Query, SearchProvider, Segment};
use farewatch_shared::Masked;
use farewatch_store::app_config::SeatsAeroConfig;
use serde_json::Value;
use tracing::{error, info};

use crate::http::{self, first_f64, first_str};

pub const SOURCE: &str = "seats.aero";
const DEFAULT_PROGRAM: &str = "SeatsAero";

/// Seats.aero partner API cached award search (points fares)
pub struct SeatsAeroProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Masked<String>,
}

impl SeatsAeroProvider {
    pub fn new(config: &SeatsAeroConfig) -> CoreResult<Self> {
        let api_key = match &config.api_key {
            Some(key) if !key.is_blank() => key.clone(),
            _ => return Err(CoreError::ConfigError("Missing seats_aero.api_key".into())),
        };
        Ok(Self {
            client: http::client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for SeatsAeroProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn search(&self, query: &Query) -> CoreResult<Vec<Offer>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Partner-Authorization", self.api_key.expose())
            .header("Accept", "application/json")
            .query(&search_params(query))
            .send()
            .await
            .map_err(|e| http::transport_error("Seats.aero request failed", e))?;

        let remaining = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (status, json) = http::read_json("Seats.aero request failed", response).await?;
        if !status.is_success() {
            error!(%status, body = %json, rate_limit_remaining = ?remaining, "Seats.aero request rejected");
            let detail = first_str(&json, &[&["message"], &["error"]])
                .map(str::to_string)
                .unwrap_or_else(|| format!("Seats.aero API error (HTTP {})", status.as_u16()));
            return Err(CoreError::UpstreamError(detail));
        }

        let offers = normalize_rows(&json, query);
        info!(
            from = %query.from,
            to = %query.to,
            count = offers.len(),
            rate_limit_remaining = ?remaining,
            "Seats.aero search complete"
        );
        Ok(offers)
    }
}

fn cabin_param(cabin: Cabin) -> &'static str {
    match cabin {
        Cabin::Economy => "economy",
        Cabin::PremiumEconomy => "premium",
        Cabin::Business => "business",
        Cabin::First => "first",
    }
}

fn search_params(query: &Query) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("origin", query.from.clone()),
        ("destination", query.to.clone()),
        ("departure_date", query.date.format("%Y-%m-%d").to_string()),
        ("cabin", cabin_param(query.cabin).to_string()),
        ("nonstop", query.nonstop.to_string()),
        ("passengers", query.passengers.to_string()),
    ];
    if query.flexible_days > 0 {
        params.push(("flexible_days", query.flexible_days.to_string()));
    }
    params
}

/// Rows arrive as a bare array or under `data` / `results`, with loosely named fields.
pub fn normalize_rows(json: &Value, query: &Query) -> Vec<Offer> {
    let rows = json
        .as_array()
        .or_else(|| json.get("data").and_then(Value::as_array))
        .or_else(|| json.get("results").and_then(Value::as_array));
    let Some(rows) = rows else {
        return Vec::new();
    };

    let date = query.date.format("%Y-%m-%d").to_string();
    rows.iter()
        .map(|row| {
            let segment = Segment {
                origin: first_str(row, &[&["origin"], &["from"]]).unwrap_or(query.from.as_str()).to_string(),
                destination: first_str(row, &[&["destination"], &["to"]]).unwrap_or(query.to.as_str()).to_string(),
                departs_at: Some(
                    first_str(row, &[&["departure"], &["departure_time"], &["departure_date"]])
                        .unwrap_or(date.as_str())
                        .to_string(),
                ),
                arrives_at: Some(
                    first_str(row, &[&["arrival"], &["arrival_time"], &["arrival_date"]])
                        .unwrap_or(date.as_str())
                        .to_string(),
                ),
                carrier: first_str(row, &[&["carrier"], &["airline"], &["marketing_carrier"]]).map(str::to_string),
                flight_number: first_str(row, &[&["flight_number"], &["flightNo"]]).map(str::to_string),
                cabin: Some(
                    first_str(row, &[&["cabin"]])
                        .and_then(|c| c.parse::<Cabin>().ok())
                        .unwrap_or(query.cabin),
                ),
            };

            let price = OfferPrice::Points {
                points: first_f64(row, &[&["points"], &["miles"], &["cost", "points"], &["cost", "miles"], &["price", "points"]])
                    .filter(|p| *p >= 0.0)
                    .map(|p| p.round() as u64),
                taxes: first_f64(row, &[&["taxes"], &["cost", "taxes"], &["price", "taxes"], &["fees"]]),
                program: first_str(row, &[&["program"], &["mileage_program"], &["loyaltyProgram"]])
                    .unwrap_or(DEFAULT_PROGRAM)
                    .to_string(),
            };

            let mut offer = Offer::new(SOURCE, price, vec![segment])
                .with_deep_link(first_str(row, &[&["url"], &["deep_link"], &["link"]]).map(str::to_string))
                .with_raw(row.clone());
            if let Some(summary) = first_str(row, &[&["summary"]]) {
                offer.summary = summary.to_string();
            }
            offer
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn query() -> Query {
        let mut q = Query::new("SFO", "HND", NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        q.cabin = Cabin::Business;
        q
    }

    #[test]
    fn test_normalize_reads_alternate_field_names() {
        let body = json!({
            "data": [{
                "mileage_program": "Aeroplan",
                "cost": { "miles": 75000, "taxes": 56.2 },
                "airline": "NH",
                "departure_time": "2026-03-04T11:00:00",
                "url": "https://seats.aero/x"
            }]
        });
        let offers = normalize_rows(&body, &query());
        assert_eq!(offers.len(), 1);

        let offer = &offers[0];
        assert_eq!(offer.source, "seats.aero");
        assert_eq!(offer.summary, "SFO→HND");
        assert_eq!(offer.deep_link.as_deref(), Some("https://seats.aero/x"));
        assert_eq!(
            offer.price,
            OfferPrice::Points { points: Some(75000), taxes: Some(56.2), program: "Aeroplan".into() }
        );

        let seg = &offer.segments[0];
        assert_eq!(seg.carrier.as_deref(), Some("NH"));
        assert_eq!(seg.departs_at.as_deref(), Some("2026-03-04T11:00:00"));
        // falls back to the query date
        assert_eq!(seg.arrives_at.as_deref(), Some("2026-03-04"));
        assert_eq!(seg.cabin, Some(Cabin::Business));
    }

    #[test]
    fn test_normalize_accepts_bare_array_and_defaults() {
        let body = json!([{ "origin": "OAK", "summary": "Award seat" }]);
        let offers = normalize_rows(&body, &query());
        assert_eq!(offers[0].summary, "Award seat");
        assert_eq!(offers[0].segments[0].origin, "OAK");
        assert_eq!(offers[0].segments[0].destination, "HND");
        assert_eq!(
            offers[0].price,
            OfferPrice::Points { points: None, taxes: None, program: "SeatsAero".into() }
        );
        assert!(normalize_rows(&json!({ "unexpected": true }), &query()).is_empty());
    }

    #[test]
    fn test_search_params() {
        let mut q = query();
        let params = search_params(&q);
        assert!(params.contains(&("cabin", "business".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "flexible_days"));

        q.flexible_days = 2;
        q.cabin = Cabin::PremiumEconomy;
        let params = search_params(&q);
        assert!(params.contains(&("flexible_days", "2".to_string())));
        assert!(params.contains(&("cabin", "premium".to_string())));
    }
}
