//! Persistence layer: the attendant store contract and its PostgreSQL
//! implementation.
//!
//! The store owns the two guarantees the services cannot provide on their
//! own: uniqueness of `(event_id, user_id)` and atomicity of the check-in
//! transition and the capacity-bounded batch insert. Every mutating method
//! applies all of its row changes or none.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Attendant;
use crate::error::GatewayError;

/// Result of an atomic check-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// This call won the transition; the returned row carries the new
    /// check-in timestamp.
    CheckedIn(Attendant),
    /// The row exists but `checked_in_at` was already set.
    AlreadyCheckedIn,
    /// No registration exists for this (event, user) pair.
    NotRegistered,
}

/// Contract for attendance record storage.
///
/// Implementations must enforce, at the storage layer:
/// - at most one row per `(event_id, user_id)`,
/// - the check-in transition succeeds only while `checked_in_at` is unset,
///   with exactly one winner under concurrent attempts,
/// - [`insert_many`](AttendantStore::insert_many) admits the whole batch
///   only if the resulting count stays within the given ceiling, evaluated
///   atomically with the insert (not check-then-act in the caller).
#[async_trait]
pub trait AttendantStore: Send + Sync + std::fmt::Debug {
    /// Returns all attendant rows for an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Attendant>, GatewayError>;

    /// Returns the current participant count for an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn count_by_event(&self, event_id: Uuid) -> Result<i64, GatewayError>;

    /// Inserts one row per user id as a single atomic unit, enforcing
    /// `max_participants` (when set) against the committed count.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CapacityExceeded`] when the batch would
    /// push the count over the ceiling (no rows are inserted), or
    /// [`GatewayError::PersistenceError`] on storage failure.
    async fn insert_many(
        &self,
        event_id: Uuid,
        user_ids: &[Uuid],
        max_participants: Option<i64>,
    ) -> Result<Vec<Attendant>, GatewayError>;

    /// Atomically sets `checked_in_at = at` if it is currently unset.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    /// Contention and missing rows are reported through
    /// [`CheckInOutcome`], not as errors.
    async fn check_in(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<CheckInOutcome, GatewayError>;

    /// Deletes one attendant row. Returns the number of rows removed
    /// (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn delete_one(&self, event_id: Uuid, user_id: Uuid) -> Result<u64, GatewayError>;

    /// Deletes the attendant rows for the given users in one statement.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn delete_many(&self, event_id: Uuid, user_ids: &[Uuid]) -> Result<u64, GatewayError>;
}
