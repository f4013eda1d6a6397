use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use farewatch_core::{CoreResult, PlanOutcome};
use farewatch_monitor::TaskStatus;
use farewatch_offer::{format_results, infer_preference, FormatOptions};
use farewatch_store::SettingsPatch;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::state::AppState;

const SUPPORTED_EXTRACTOR: &str = "openai";
const GENERIC_FAILURE: &str = "Something went wrong on my side (it has been logged). Could you send that again?";
const NOT_MONITORING: &str = "No monitor is running.";
const POLL_USAGE: &str = "Usage: `@poll 3` (refresh every 3 minutes)";
const HELP: &str = "Commands:\n\
- `@provider openai`\n\
- `@model gpt-4.1-mini` (or any model your key can use)\n\
- `@show` current settings\n\
- `@poll <minutes>` monitor your last search\n\
- `@status` / `@stop`\n\
\n\
Then just write: `SFO to Tokyo next Wednesday, business, 2 people`";

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageReply {
    pub reply: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/users/{user_id}/messages", post(post_message))
}

async fn post_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageReply>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::ValidationError("text must not be empty".into()));
    }

    let reply = match handle_message(&state, &user_id, text).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(%user_id, error = %e, "Message handling failed");
            GENERIC_FAILURE.to_string()
        }
    };
    Ok(Json(MessageReply { reply }))
}

/// Route one chat message: `@` commands, otherwise a flight search request
pub async fn handle_message(state: &AppState, user_id: &str, text: &str) -> CoreResult<String> {
    match parse_command(text) {
        Some((command, args)) => Ok(handle_command(state, user_id, &command, &args)),
        None => handle_search(state, user_id, text).await,
    }
}

fn parse_command(text: &str) -> Option<(String, Vec<&str>)> {
    let text = text.trim();
    if !text.starts_with('@') {
        return None;
    }
    let mut parts = text.split_whitespace();
    let command = parts.next()?.to_lowercase();
    Some((command, parts.collect()))
}

fn handle_command(state: &AppState, user_id: &str, command: &str, args: &[&str]) -> String {
    debug!(%user_id, command, "Handling command");
    match command {
        "@help" => HELP.to_string(),
        "@show" => {
            let settings = state.settings.get(user_id);
            format!("Current settings: provider={}, model={}", settings.provider, settings.model)
        }
        "@provider" => match args.first().map(|p| p.to_lowercase()) {
            None => "Usage: `@provider openai`".to_string(),
            Some(provider) if provider != SUPPORTED_EXTRACTOR => "Only `openai` is supported for now.".to_string(),
            Some(provider) => {
                let settings = state.settings.update(user_id, SettingsPatch { provider: Some(provider), model: None });
                format!("OK ✅ provider={} (model={})", settings.provider, settings.model)
            }
        },
        "@model" => match args.first() {
            None => "Usage: `@model gpt-4.1-mini`".to_string(),
            Some(model) => {
                let patch = SettingsPatch { provider: None, model: Some(model.to_string()) };
                format!("OK ✅ model={}", state.settings.update(user_id, patch).model)
            }
        },
        "@poll" => start_polling(state, user_id, args.first().copied()),
        "@stop" => {
            if state.scheduler.stop(user_id) {
                "Stopped ✅".to_string()
            } else {
                NOT_MONITORING.to_string()
            }
        }
        "@status" => match state.scheduler.status(user_id) {
            Some(status) => describe_status(&status),
            None => NOT_MONITORING.to_string(),
        },
        _ => "Unknown command. Send `@help` for usage.".to_string(),
    }
}

/// Positive, finite minutes as a timer interval
fn parse_interval(arg: Option<&str>) -> Option<Duration> {
    let minutes: f64 = arg?.parse().ok()?;
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

fn format_minutes(interval: Duration) -> String {
    let secs = interval.as_secs_f64();
    if interval.subsec_nanos() == 0 && interval.as_secs() % 60 == 0 {
        format!("{}", interval.as_secs() / 60)
    } else {
        format!("{:.1}", secs / 60.0)
    }
}

fn start_polling(state: &AppState, user_id: &str, arg: Option<&str>) -> String {
    let Some(interval) = parse_interval(arg) else {
        return POLL_USAGE.to_string();
    };
    let Some(last) = state.planned.last(user_id) else {
        return "Send a search first (e.g. `SFO -> HND 2026-03-04 business 2 people cheapest`); \
                I can start monitoring once it is understood."
            .to_string();
    };

    // Criteria come from the request that produced the query, not from later messages
    let preference = infer_preference(&last.request_text, &last.query);
    let status = state
        .scheduler
        .start(user_id, interval, last.query, preference, state.cycle.clone());

    format!(
        "OK ✅ I'll refresh every {} min ({}). Use `@stop` to stop.",
        format_minutes(status.interval),
        status.preference
    )
}

fn describe_status(status: &TaskStatus) -> String {
    format!(
        "Monitoring ✅ every {} min.\nfrom={}, to={}, date={}\nPreference: {}",
        format_minutes(status.interval),
        status.query.from,
        status.query.to,
        status.query.date,
        status.preference
    )
}

async fn handle_search(state: &AppState, user_id: &str, text: &str) -> CoreResult<String> {
    let settings = state.settings.get(user_id);
    if settings.provider != SUPPORTED_EXTRACTOR {
        return Ok("Only the openai provider is supported. Send `@provider openai`.".to_string());
    }

    let normalized = state.normalizer.normalize(text);
    let query = match state.planner.plan(&normalized, &settings.model).await? {
        PlanOutcome::Planned(query) => query,
        PlanOutcome::Clarify(question) => return Ok(question),
    };

    let key = query.cache_key(state.provider.name());
    let (offers, cache_hit) = match state.cache.get(&key) {
        Some(offers) => (offers, true),
        None => {
            let offers = state.provider.search(&query).await?;
            state.cache.insert(key, offers.clone());
            (offers, false)
        }
    };
    info!(%user_id, from = %query.from, to = %query.to, count = offers.len(), cache_hit, "Search answered");

    state.planned.remember(user_id, query.clone(), text);
    let preference = infer_preference(&normalized, &query);
    Ok(format_results(&query, &offers, &preference, FormatOptions { top_n: state.top_n, cache_hit }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  @POLL 3 "), Some(("@poll".to_string(), vec!["3"])));
        assert_eq!(parse_command("@stop"), Some(("@stop".to_string(), vec![])));
        assert_eq!(parse_command("SFO @ HND"), None);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval(Some("3")), Some(Duration::from_secs(180)));
        assert_eq!(parse_interval(Some("0.5")), Some(Duration::from_secs(30)));
        assert_eq!(parse_interval(Some("0")), None);
        assert_eq!(parse_interval(Some("-2")), None);
        assert_eq!(parse_interval(Some("soon")), None);
        assert_eq!(parse_interval(Some("inf")), None);
        assert_eq!(parse_interval(Some("1e300")), None);
        assert_eq!(parse_interval(None), None);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(Duration::from_secs(180)), "3");
        assert_eq!(format_minutes(Duration::from_secs(30)), "0.5");
    }
}
