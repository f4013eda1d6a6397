use farewatch_core::CoreError;
use serde_json::Value;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn client() -> Result<reqwest::Client, CoreError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| CoreError::InternalError(format!("Failed to build HTTP client: {}", e)))
}

pub fn transport_error(context: &str, err: reqwest::Error) -> CoreError {
    CoreError::UpstreamError(format!("{}: {}", context, err))
}

/// Read a response body as JSON. Bodies that are not JSON come back as `{"_raw": "..."}`.
pub async fn read_json(context: &str, response: reqwest::Response) -> Result<(reqwest::StatusCode, Value), CoreError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| transport_error(context, e))?;
    let json = if body.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&body).unwrap_or_else(|_| serde_json::json!({ "_raw": truncate(&body, 200) }))
    };
    Ok((status, json))
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// First non-empty string found under any of `paths` (each a list of object keys)
pub fn first_str<'v>(value: &'v Value, paths: &[&[&str]]) -> Option<&'v str> {
    paths.iter().find_map(|path| lookup(value, path).and_then(Value::as_str).filter(|s| !s.is_empty()))
}

/// First numeric value found under any of `paths`. Numeric strings count.
pub fn first_f64(value: &Value, paths: &[&[&str]]) -> Option<f64> {
    paths.iter().find_map(|path| {
        lookup(value, path).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    })
}

fn lookup<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(value, |v, key| v.get(key)).filter(|v| !v.is_null())
}
