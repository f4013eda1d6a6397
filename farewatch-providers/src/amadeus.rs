use async_trait::async_trait;
use farewatch_core::{Cabin, CoreError, CoreResult, Offer, OfferPrice, Query, SearchProvider, Segment};
use farewatch_shared::Masked;
use farewatch_store::app_config::AmadeusConfig;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::http::{self, first_f64, first_str};

pub const SOURCE: &str = "amadeus";

/// Tokens are refreshed this long before the server says they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_TTL_SECS: u64 = 1800;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Amadeus Self-Service flight offers search (cash fares)
pub struct AmadeusProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Masked<String>,
    api_secret: Masked<String>,
    max_results: u32,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusProvider {
    pub fn new(config: &AmadeusConfig, max_results: u32) -> CoreResult<Self> {
        let (api_key, api_secret) = match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) if !key.is_blank() && !secret.is_blank() => (key.clone(), secret.clone()),
            _ => return Err(CoreError::ConfigError("Missing amadeus.api_key / amadeus.api_secret".into())),
        };

        Ok(Self {
            client: http::client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
            max_results,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> CoreResult<String> {
        // Held across the refresh so concurrent searches share one token request
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let url = format!("{}/v1/security/oauth2/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.expose().as_str()),
                ("client_secret", self.api_secret.expose().as_str()),
            ])
            .send()
            .await
            .map_err(|e| http::transport_error("Amadeus token request failed", e))?;

        let (status, json) = http::read_json("Amadeus token request failed", response).await?;
        if !status.is_success() {
            error!(%status, body = %json, "Amadeus token request rejected");
            let detail = first_str(&json, &[&["error_description"], &["error"]])
                .map(str::to_string)
                .unwrap_or_else(|| format!("Token error HTTP {}", status.as_u16()));
            return Err(CoreError::UpstreamError(detail));
        }

        let token = parse_token(&json, Instant::now())?;
        debug!("Amadeus access token refreshed");
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

#[async_trait]
impl SearchProvider for AmadeusProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn search(&self, query: &Query) -> CoreResult<Vec<Offer>> {
        let token = self.access_token().await?;

        let mut params = vec![
            ("originLocationCode", query.from.clone()),
            ("destinationLocationCode", query.to.clone()),
            ("departureDate", query.date.format("%Y-%m-%d").to_string()),
            ("adults", query.passengers.max(1).to_string()),
            ("travelClass", travel_class(query.cabin).to_string()),
            ("max", self.max_results.to_string()),
        ];
        if query.nonstop {
            params.push(("nonStop", "true".to_string()));
        }

        let url = format!("{}/v2/shopping/flight-offers", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| http::transport_error("Amadeus offers request failed", e))?;

        let (status, json) = http::read_json("Amadeus offers request failed", response).await?;
        if !status.is_success() {
            error!(%status, body = %json, "Amadeus offers request rejected");
            return Err(CoreError::UpstreamError(error_detail(&json, status.as_u16())));
        }

        let offers = normalize_offers(&json);
        info!(from = %query.from, to = %query.to, count = offers.len(), "Amadeus search complete");
        Ok(offers)
    }
}

fn parse_token(json: &Value, now: Instant) -> CoreResult<AccessToken> {
    let value = first_str(json, &[&["access_token"]])
        .ok_or_else(|| CoreError::UpstreamError("Amadeus token response has no access_token".into()))?;
    let ttl = json.get("expires_in").and_then(Value::as_u64).unwrap_or(DEFAULT_TOKEN_TTL_SECS);
    Ok(AccessToken { value: value.to_string(), expires_at: now + Duration::from_secs(ttl) })
}

fn travel_class(cabin: Cabin) -> &'static str {
    match cabin {
        Cabin::Economy => "ECONOMY",
        Cabin::PremiumEconomy => "PREMIUM_ECONOMY",
        Cabin::Business => "BUSINESS",
        Cabin::First => "FIRST",
    }
}

fn error_detail(json: &Value, status: u16) -> String {
    json.get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first_str(first, &[&["detail"], &["title"]]))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Offers error HTTP {}", status))
}

/// Flatten every itinerary's segments into one list per offer
pub fn normalize_offers(json: &Value) -> Vec<Offer> {
    let Some(rows) = json.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| {
            let segments = row
                .get("itineraries")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .flat_map(|itinerary| itinerary.get("segments").and_then(Value::as_array).into_iter().flatten())
                .map(normalize_segment)
                .collect();

            let price = OfferPrice::Cash {
                amount: first_f64(row, &[&["price", "grandTotal"], &["price", "total"]]),
                currency: first_str(row, &[&["price", "currency"]]).unwrap_or("USD").to_string(),
            };

            Offer::new(SOURCE, price, segments).with_raw(row.clone())
        })
        .collect()
}

fn normalize_segment(raw: &Value) -> Segment {
    let carrier = first_str(raw, &[&["carrierCode"]]).map(str::to_string);
    let flight_number = first_str(raw, &[&["number"]])
        .map(|number| format!("{}{}", carrier.as_deref().unwrap_or_default(), number));

    Segment {
        origin: first_str(raw, &[&["departure", "iataCode"]]).unwrap_or_default().to_string(),
        destination: first_str(raw, &[&["arrival", "iataCode"]]).unwrap_or_default().to_string(),
        departs_at: first_str(raw, &[&["departure", "at"]]).map(str::to_string),
        arrives_at: first_str(raw, &[&["arrival", "at"]]).map(str::to_string),
        carrier,
        flight_number,
        cabin: None,
    }
}
