//! Per-event registry of live subscriber channels.
//!
//! [`NotificationHub`] keeps a concurrency-safe map from event id to the
//! set of live subscriber channels and fans roster changes out to them.
//! Delivery is best-effort: a slow or disconnected subscriber never blocks
//! or fails the publishing operation, and there is no history or replay —
//! a subscriber registered after a publish misses it permanently.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Named frame kinds pushed over a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// One-time acknowledgement sent right after subscribing.
    Init,
    /// A participant checked in; payload is their public view.
    ParticipantCheckedIn,
}

impl FrameKind {
    /// Wire name of the frame, used as the SSE event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::ParticipantCheckedIn => "participant-checked-in",
        }
    }
}

/// One frame on a live connection: a named kind plus its payload.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame discriminator.
    pub kind: FrameKind,
    /// Serialized payload: a plain string for `INIT`, JSON otherwise.
    pub data: String,
}

impl Frame {
    /// Converts the frame into an SSE event with the kind as event name.
    #[must_use]
    pub fn into_sse_event(self) -> axum::response::sse::Event {
        axum::response::sse::Event::default()
            .event(self.kind.as_str())
            .data(self.data)
    }
}

/// Per-event fan-out registry for live roster updates.
///
/// Instantiated once per server process and shared via [`crate::app_state::AppState`].
/// Each subscriber gets its own bounded channel; within one event id,
/// frames reach every live subscriber in publish order (channel FIFO).
#[derive(Debug)]
pub struct NotificationHub {
    channel_capacity: usize,
    subscribers: RwLock<HashMap<Uuid, Vec<mpsc::Sender<Frame>>>>,
}

impl NotificationHub {
    /// Creates an empty hub. `channel_capacity` bounds each subscriber's
    /// in-flight frames.
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new live channel scoped to `event_id` and returns its
    /// receiving end. An `INIT` frame is queued best-effort before the
    /// receiver is handed out; failure to queue it is logged, not fatal.
    pub async fn subscribe(&self, event_id: Uuid) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let init = Frame {
            kind: FrameKind::Init,
            data: format!("subscribed to live updates for event {event_id}"),
        };
        if let Err(e) = tx.try_send(init) {
            tracing::warn!(%event_id, error = %e, "could not queue INIT frame");
        }

        let mut map = self.subscribers.write().await;
        map.entry(event_id).or_default().push(tx);
        tracing::debug!(%event_id, "live subscriber registered");
        rx
    }

    /// Delivers `payload` tagged `kind` to every live subscriber of
    /// `event_id`. Never blocks: a full channel drops the frame for that
    /// subscriber (logged), a closed channel removes the subscriber.
    /// Returns the number of subscribers the frame was queued for.
    pub async fn publish<T: Serialize>(&self, event_id: Uuid, kind: FrameKind, payload: &T) -> usize {
        let data = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(%event_id, error = %e, "unserializable hub payload");
                return 0;
            }
        };

        let mut map = self.subscribers.write().await;
        let Some(senders) = map.get_mut(&event_id) else {
            return 0;
        };

        let mut delivered = 0;
        senders.retain(|tx| {
            match tx.try_send(Frame {
                kind,
                data: data.clone(),
            }) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%event_id, "subscriber lagging, frame dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(%event_id, "removing disconnected subscriber");
                    false
                }
            }
        });
        if senders.is_empty() {
            map.remove(&event_id);
        }
        delivered
    }

    /// Returns the number of live subscribers for `event_id`.
    pub async fn subscriber_count(&self, event_id: Uuid) -> usize {
        self.subscribers
            .read()
            .await
            .get(&event_id)
            .map_or(0, Vec::len)
    }
}
