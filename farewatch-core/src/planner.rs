use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::search::Query;
use crate::supplier::QueryExtractor;
use crate::CoreResult;

const EXAMPLE_REQUEST: &str = "You can write it like: `SFO -> HND, 2026-03-04, 2 adults, business`";
const DEFAULT_QUESTION: &str = "I still need a little more: origin, destination and date. Could you add them?";

/// Result of turning a free-text request into a `Query`
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Planned(Query),
    Clarify(String),
}

/// Drives the external extractor, with one retry for non-JSON replies and one for invalid fields.
pub struct QueryPlanner {
    extractor: Arc<dyn QueryExtractor>,
}

impl QueryPlanner {
    pub fn new(extractor: Arc<dyn QueryExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn plan(&self, text: &str, model: &str) -> CoreResult<PlanOutcome> {
        let raw = self.extractor.extract(text, model).await?;
        let parsed = match parse_json_object(&raw) {
            Some(value) => value,
            None => {
                debug!("Extractor reply was not JSON, retrying once");
                let retry = format!("Output ONLY valid JSON for this request: {}", text);
                let raw = self.extractor.extract(&retry, model).await?;
                match parse_json_object(&raw) {
                    Some(value) => value,
                    None => {
                        return Ok(PlanOutcome::Clarify(format!(
                            "I couldn't reliably understand that request. {}",
                            EXAMPLE_REQUEST
                        )))
                    }
                }
            }
        };

        if needs_clarification(&parsed) {
            return Ok(validate_or_clarify(&parsed));
        }

        let invalid = match Query::from_value(&parsed) {
            Ok(query) => return Ok(PlanOutcome::Planned(query)),
            Err(invalid) => invalid,
        };

        let retry = format!(
            "The previous JSON is missing/invalid fields: {}. \
             Please output ONLY JSON matching keys {{from,to,date,passengers,cabin,nonstop,flexibleDays}}. \
             Original request: {}",
            invalid.join(", "),
            text
        );
        let raw = self.extractor.extract(&retry, model).await?;

        Ok(match parse_json_object(&raw) {
            Some(second) => validate_or_clarify(&second),
            None => validate_or_clarify(&parsed),
        })
    }
}

fn needs_clarification(value: &Value) -> bool {
    value.get("need_clarification").and_then(Value::as_bool).unwrap_or(false)
}

/// Final validation step: either a planned query or a user-facing question.
pub fn validate_or_clarify(value: &Value) -> PlanOutcome {
    if needs_clarification(value) {
        let question = value
            .get("question")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_QUESTION);
        return PlanOutcome::Clarify(question.to_string());
    }

    match Query::from_value(value) {
        Ok(query) => PlanOutcome::Planned(query),
        Err(invalid) => {
            warn!(invalid = ?invalid, raw = %value, "Extracted query failed validation");

            let needs: Vec<&str> = invalid
                .iter()
                .filter_map(|field| match *field {
                    "from" => Some("origin (e.g. SFO)"),
                    "to" => Some("destination (e.g. HND/NRT)"),
                    "date" => Some("date (e.g. 2026-03-04)"),
                    _ => None,
                })
                .collect();
            let missing = if needs.is_empty() { "the key details".to_string() } else { needs.join(", ") };

            PlanOutcome::Clarify(format!("I couldn't find {}.\n{}", missing, EXAMPLE_REQUEST))
        }
    }
}

/// Parse a JSON object, tolerating prose or code fences around it.
fn parse_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value).filter(Value::is_object);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok().filter(Value::is_object)
}
