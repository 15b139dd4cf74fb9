//! Server-Sent Events (SSE) stream of job lifecycle and progress events.

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::extract::State;
use futures_core::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::{AppEvent, SharedState};

/// SSE endpoint. Lagged receivers skip what they missed.
pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok().and_then(|event| to_sse(&event)).map(Ok));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_sse(event: &AppEvent) -> Option<Event> {
    let name = match event {
        AppEvent::JobStatus { .. } => "job_status",
        AppEvent::JobProgress { .. } => "job_progress",
    };
    serde_json::to_string(event).ok().map(|data| Event::default().event(name).data(data))
}
