use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use farewatch_core::Query;
use farewatch_monitor::TaskStatus;
use farewatch_offer::Preference;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// JSON view of a running monitor
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorView {
    pub task_id: Uuid,
    pub interval_seconds: f64,
    pub query: Query,
    pub preference: Preference,
    pub preference_label: String,
    pub started_at: DateTime<Utc>,
}

impl From<TaskStatus> for MonitorView {
    fn from(status: TaskStatus) -> Self {
        Self {
            task_id: status.task_id,
            interval_seconds: status.interval.as_secs_f64(),
            preference_label: status.preference.to_string(),
            query: status.query,
            preference: status.preference,
            started_at: status.started_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/users/{user_id}/monitor", get(get_monitor).delete(delete_monitor))
}

async fn get_monitor(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MonitorView>, AppError> {
    state
        .scheduler
        .status(&user_id)
        .map(|status| Json(status.into()))
        .ok_or_else(|| AppError::NotFoundError(format!("No monitor is running for {}", user_id)))
}

async fn delete_monitor(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<StatusCode, AppError> {
    if state.scheduler.stop(&user_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFoundError(format!("No monitor is running for {}", user_id)))
    }
}
