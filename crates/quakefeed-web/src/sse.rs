//! `/api/events`: feed mutations pushed to renderers as named SSE events.
//!
//! Each `FeedEvent` goes out under its own event name with the JSON payload as
//! data. A subscriber that falls behind the broadcast buffer receives a
//! `resync` event carrying the number of missed events and should re-read
//! `/api/feed`.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use quakefeed_feed::FeedEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::state::SharedState;

pub const RESYNC_EVENT: &str = "resync";

pub fn event_name(event: &FeedEvent) -> &'static str {
    match event {
        FeedEvent::BatchApplied { .. }   => "batch_applied",
        FeedEvent::PollFailed { .. }     => "poll_failed",
        FeedEvent::RunningChanged { .. } => "running_changed",
    }
}

fn to_sse(received: Result<FeedEvent, BroadcastStreamRecvError>) -> Option<Event> {
    match received {
        Ok(event) => match Event::default().event(event_name(&event)).json_data(&event) {
            Ok(sse) => Some(sse),
            Err(e) => {
                warn!("failed to encode feed event: {}", e);
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            debug!(missed, "event subscriber lagged, asking for resync");
            Some(Event::default().event(RESYNC_EVENT).data(missed.to_string()))
        }
    }
}

pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.subscribe())
        .filter_map(to_sse)
        .map(Ok::<_, Infallible>);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
