//! Live update stream.
//!
//! One server-sent-events stream per viewer. It starts with a snapshot of
//! every board's last-known state and every active lock, then carries each
//! [`RelayChanged`] and [`LockChanged`] published on the bus. A slow viewer
//! that falls behind skips the missed events; the next event for the same
//! board or equipment carries the current state anyway.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use relay_events::{LiveMessage, LockChanged};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// GET /relay/events
pub async fn live_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before reading the snapshot so nothing published in between is lost.
    let relay_rx = state.bus.subscribe_relay();
    let lock_rx = state.bus.subscribe_lock();

    let mut snapshot: Vec<LiveMessage> = state
        .boards
        .known_states()
        .await?
        .into_iter()
        .map(LiveMessage::from)
        .collect();
    snapshot.extend(
        state
            .locks
            .active_locks()
            .await?
            .iter()
            .map(|lock| LiveMessage::from(LockChanged::from(lock))),
    );

    tracing::debug!(user_id = user.user_id, snapshot = snapshot.len(), "Live viewer connected");

    let relays = bus_messages(relay_rx, "relay");
    let locks = bus_messages(lock_rx, "lock");

    let events = stream::iter(snapshot)
        .chain(stream::select(relays, locks))
        .filter_map(|message| async move { to_event(&message) })
        .take_until(state.shutdown.clone().cancelled_owned());

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.config.live_keepalive)
            .text("heartbeat"),
    ))
}

fn to_event(message: &LiveMessage) -> Option<Result<Event, Infallible>> {
    match message.to_json() {
        Ok(json) => Some(Ok(Event::default().data(json))),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize live message");
            None
        }
    }
}

/// Messages from one bus channel. A lagging viewer skips what it missed; the
/// stream ends when the bus is dropped.
fn bus_messages<T>(rx: broadcast::Receiver<T>, kind: &'static str) -> impl Stream<Item = LiveMessage>
where
    T: Clone + Send + 'static,
    LiveMessage: From<T>,
{
    stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((LiveMessage::from(event), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(kind, skipped, "Live viewer lagged behind bus");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
