use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{info, warn};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/users/{user_id}/notifications", get(notifications))
}

/// Server-Sent Events feed of one user's monitor notifications
async fn notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(%user_id, "Notification stream opened");
    let rx = state.notifier.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let user_id = user_id.clone();
        async move {
            match result {
                Ok(notification) if notification.user_id == user_id => Event::default()
                    .event(notification.kind.as_str())
                    .json_data(&notification)
                    .ok()
                    .map(Ok),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(%user_id, skipped, "Notification stream lagged");
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
