//! Attendance records and their public views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserRecord;

/// One user's participation in one event.
///
/// The pair `(event_id, user_id)` is unique across all rows. `checked_in_at`
/// starts out unset and transitions to a timestamp exactly once; it is never
/// cleared or overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendant {
    /// Row identifier.
    pub id: Uuid,
    /// Event this registration belongs to.
    pub event_id: Uuid,
    /// Registered user.
    pub user_id: Uuid,
    /// Set when the registration is created.
    pub joined_at: DateTime<Utc>,
    /// Set once by check-in; always `>= joined_at`.
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Attendant {
    /// Returns `true` if this attendant has already checked in.
    #[must_use]
    pub const fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }
}

/// Public view of a participant: the attendant row joined with a user
/// (and unit) summary. Returned by the list/add/check-in operations and
/// pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    /// Attendant row identifier.
    pub id: Uuid,
    /// Event identifier.
    pub event_id: Uuid,
    /// Registration timestamp.
    pub joined_at: DateTime<Utc>,
    /// Check-in timestamp, if any.
    pub check_in_time: Option<DateTime<Utc>>,
    /// Embedded user summary.
    pub user: UserRecord,
}

impl ParticipantView {
    /// Builds a view from an attendant row and its resolved user.
    #[must_use]
    pub fn from_parts(attendant: &Attendant, user: UserRecord) -> Self {
        Self {
            id: attendant.id,
            event_id: attendant.event_id,
            joined_at: attendant.joined_at,
            check_in_time: attendant.checked_in_at,
            user,
        }
    }
}

/// Outcome of a bulk import: how many rows were admitted and why the rest
/// were skipped. Skips are never errors; only event-state preconditions
/// and capacity overflow abort an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportSummary {
    /// Number of raw entries extracted from the file.
    pub total: usize,
    /// Number of newly admitted participants.
    pub success: usize,
    /// `invalid_format + not_found_in_db + already_joined`.
    pub skipped: usize,
    /// Entries that did not look like an email address.
    pub invalid_format: usize,
    /// Well-formed emails with no matching user.
    pub not_found_in_db: usize,
    /// Users already on the roster, including duplicates within the file.
    pub already_joined: usize,
}
