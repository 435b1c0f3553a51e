//! Server-sent change feed

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::Stream;
use tracing::{debug, error};

use crate::AppState;

/// Interval between keep-alive comments
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// GET /api/events - Stream ledger changes as server-sent events
///
/// Each event is named after the change (`transaction_added`,
/// `budget_changed`, ...) and carries the change as JSON. The stream ends
/// when the server shuts down or the client disconnects, which drops the
/// subscription.
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.events.subscribe();
    debug!(
        subscribers = state.events.subscriber_count(),
        "Change feed client connected"
    );

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match Event::default().event(event.name()).json_data(&event) {
                Ok(sse_event) => yield Ok(sse_event),
                Err(e) => error!(error = %e, "Failed to serialize change event"),
            }
        }
        debug!("Change feed closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEPALIVE_INTERVAL))
}
