use async_trait::async_trait;
use farewatch_core::{CoreResult, Offer, OfferPrice, Query, SearchProvider, Segment};
use tracing::debug;

pub const SOURCE: &str = "dummy";

/// Offline provider returning one fixed award offer, for local runs without API keys
pub struct DummyProvider;

#[async_trait]
impl SearchProvider for DummyProvider {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn search(&self, query: &Query) -> CoreResult<Vec<Offer>> {
        debug!(from = %query.from, to = %query.to, "Dummy search");
        let date = query.date.format("%Y-%m-%d").to_string();
        let segment = Segment {
            origin: query.from.clone(),
            destination: query.to.clone(),
            departs_at: Some(date.clone()),
            arrives_at: Some(date),
            carrier: Some("XX".into()),
            flight_number: Some("123".into()),
            cabin: Some(query.cabin),
        };
        let price = OfferPrice::Points { points: Some(75000), taxes: Some(56.0), program: "ExampleProgram".into() };

        let mut offer = Offer::new(SOURCE, price, vec![segment]);
        offer.summary = "Dummy itinerary".into();
        Ok(vec![offer])
    }
}
