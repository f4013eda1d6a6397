use farewatch_core::{Offer, OfferPrice, Query};

use crate::features::{enrich, EnrichedOffer};
use crate::preference::Preference;
use crate::ranker::rank;

pub const DEFAULT_TOP_N: usize = 3;

/// Presentation options for `format_results`
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub top_n: usize,
    pub cache_hit: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N, cache_hit: false }
    }
}

/// Render the top ranked offers as a chat message
pub fn format_results(query: &Query, offers: &[Offer], preference: &Preference, options: FormatOptions) -> String {
    let header = format!(
        "Parsed ✅\nfrom={}, to={}, date={}, pax={}, cabin={}, nonstop={}\n",
        query.from, query.to, query.date, query.passengers, query.cabin, query.nonstop
    );

    if offers.is_empty() {
        return header + "\nNo results found.";
    }

    let enriched = enrich(offers);
    let ranked = rank(&enriched, preference);
    let shown: Vec<String> = ranked
        .iter()
        .take(options.top_n)
        .enumerate()
        .map(|(idx, offer)| format_line(idx + 1, offer))
        .collect();

    let mut out = header;
    out.push_str(&format!("\nTop {}:\n", shown.len()));
    out.push_str(&shown.join("\n"));
    out.push_str(&format!("\nPreference: {}", preference));
    if options.cache_hit {
        out.push_str("\n(served from cache ✅)");
    }
    out.push_str("\nYou can also say: `fewest stops` / `cheapest` / `nonstop` / `earliest arrival`");
    out
}

fn format_line(position: usize, offer: &EnrichedOffer<'_>) -> String {
    let stops = match offer.stops {
        0 => "nonstop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    };
    let first = offer.offer.segments.first().and_then(|s| s.departs_at.as_deref());
    let last = offer.offer.segments.last().and_then(|s| s.arrives_at.as_deref());

    format!(
        "{}. {} | {} | {}→{} | {} | {}",
        position,
        offer.route,
        stops,
        short_time(first),
        short_time(last),
        offer.carriers,
        format_price(&offer.offer.price)
    )
}

/// `2026-03-04T10:30:00` becomes `03-04 10:30`; anything else is shown as-is.
fn short_time(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "N/A".to_string();
    };
    let bytes = raw.as_bytes();
    let looks_iso = raw.len() >= 16
        && raw.is_char_boundary(16)
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
        && bytes[13] == b':';
    if looks_iso {
        format!("{} {}", &raw[5..10], &raw[11..16])
    } else {
        raw.to_string()
    }
}

fn format_money(amount: f64) -> String {
    let formatted = format!("{:.2}", amount);
    formatted.strip_suffix(".00").map(str::to_string).unwrap_or(formatted)
}

pub fn format_price(price: &OfferPrice) -> String {
    match price {
        OfferPrice::Cash { amount: Some(amount), currency } => format!("{} {}", currency, format_money(*amount)),
        OfferPrice::Cash { amount: None, currency } => format!("{} N/A", currency),
        OfferPrice::Points { points, taxes, program } => {
            let points = points.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string());
            let taxes = taxes.map(format_money).unwrap_or_else(|| "N/A".to_string());
            format!("{} pts + {} taxes ({})", points, taxes, program)
        }
    }
}
