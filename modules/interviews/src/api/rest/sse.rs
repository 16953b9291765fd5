use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::api::rest::dto::SnapshotEvent;
use crate::domain::sync::SyncState;

pub const SNAPSHOT_EVENT: &str = "interviews_snapshot";

/// Snapshots of `user_id` as they land in the canonical state. States for
/// other users, and states still waiting for a first delivery, are skipped.
pub fn snapshot_stream(
    rx: watch::Receiver<SyncState>,
    user_id: String,
) -> impl Stream<Item = SnapshotEvent> {
    WatchStream::new(rx).filter_map(move |state| {
        let wanted = state.user_id.as_deref() == Some(user_id.as_str())
            && (state.loaded || state.error.is_some());
        let event = wanted.then(|| SnapshotEvent::from(&state.snapshot()));
        async move { event }
    })
}

/// Named-event SSE response with periodic keepalive pings.
pub fn snapshot_response(
    rx: watch::Receiver<SyncState>,
    user_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = snapshot_stream(rx, user_id).map(|msg| {
        let ev = Event::default()
            .event(SNAPSHOT_EVENT)
            .json_data(&msg)
            .unwrap_or_else(|_| {
                // a tiny text marker keeps the stream alive
                Event::default()
                    .event(SNAPSHOT_EVENT)
                    .data("serialization_error")
            });
        Ok(ev)
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
