//! Events as seen by the attendance engine, and the derived status function.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit lifecycle flag stored on an event. Absent means the stage is
/// derived from the time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventFlag {
    /// The event was cancelled by its organizers.
    Cancelled,
    /// The event was explicitly closed.
    Completed,
}

/// Derived lifecycle stage of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// `now < start_time` and no explicit flag.
    Upcoming,
    /// Between start and end.
    Ongoing,
    /// Past `end_time`, or flagged completed.
    Completed,
    /// Flagged cancelled.
    Cancelled,
}

/// An event as consumed by the attendance engine. Event CRUD itself is
/// external; this is the read model behind [`crate::external::EventGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
    /// Participant ceiling. `None` means unlimited.
    pub max_participants: Option<i64>,
    /// Explicit lifecycle flag, taking precedence over the time window.
    pub flag: Option<EventFlag>,
    /// Opaque per-event secret authorizing check-in via QR scan.
    pub join_token: String,
}

impl EventRecord {
    /// Computes the event's derived display status at `now`.
    ///
    /// The explicit flag wins; otherwise the stage falls out of the time
    /// window. Pure function, shared by the check-in and roster
    /// preconditions.
    #[must_use]
    pub fn display_status(&self, now: DateTime<Utc>) -> EventStatus {
        match self.flag {
            Some(EventFlag::Cancelled) => EventStatus::Cancelled,
            Some(EventFlag::Completed) => EventStatus::Completed,
            None => {
                if now < self.start_time {
                    EventStatus::Upcoming
                } else if now > self.end_time {
                    EventStatus::Completed
                } else {
                    EventStatus::Ongoing
                }
            }
        }
    }

    /// Returns `true` if the event has been explicitly cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.flag, Some(EventFlag::Cancelled))
    }

    /// Returns `true` if the event already started at `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }
}
