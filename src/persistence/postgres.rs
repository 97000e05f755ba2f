//! PostgreSQL implementation of the attendant store.
//!
//! Row shape lives in `migrations/`. The unique index on
//! `(event_id, user_id)` backs the uniqueness invariant; the conditional
//! `UPDATE … WHERE checked_in_at IS NULL` makes check-in a one-winner
//! transition; the batch insert takes a per-event advisory lock so the
//! count-compare-insert sequence is serialized against concurrent batches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AttendantStore, CheckInOutcome};
use crate::domain::Attendant;
use crate::error::GatewayError;

/// Tuple shape fetched for attendant rows.
type AttendantRow = (Uuid, Uuid, Uuid, DateTime<Utc>, Option<DateTime<Utc>>);

const ATTENDANT_COLUMNS: &str = "id, event_id, user_id, joined_at, checked_in_at";

fn row_to_attendant(row: AttendantRow) -> Attendant {
    let (id, event_id, user_id, joined_at, checked_in_at) = row;
    Attendant {
        id,
        event_id,
        user_id,
        joined_at,
        checked_in_at,
    }
}

fn persistence_err(e: sqlx::Error) -> GatewayError {
    GatewayError::PersistenceError(e.to_string())
}

/// PostgreSQL-backed attendant store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgAttendantStore {
    pool: PgPool,
}

impl PgAttendantStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendantStore for PgAttendantStore {
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Attendant>, GatewayError> {
        let rows = sqlx::query_as::<_, AttendantRow>(&format!(
            "SELECT {ATTENDANT_COLUMNS} FROM attendants WHERE event_id = $1 ORDER BY joined_at ASC",
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(rows.into_iter().map(row_to_attendant).collect())
    }

    async fn count_by_event(&self, event_id: Uuid) -> Result<i64, GatewayError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendants WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(persistence_err)
    }

    async fn insert_many(
        &self,
        event_id: Uuid,
        user_ids: &[Uuid],
        max_participants: Option<i64>,
    ) -> Result<Vec<Attendant>, GatewayError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(persistence_err)?;

        // Serializes capacity evaluation against concurrent batches for
        // the same event; released at commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence_err)?;

        if let Some(max) = max_participants {
            let current =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendants WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(persistence_err)?;
            let added = i64::try_from(user_ids.len()).unwrap_or(i64::MAX);
            if current.saturating_add(added) > max {
                return Err(GatewayError::CapacityExceeded);
            }
        }

        let mut inserted = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let row = sqlx::query_as::<_, AttendantRow>(&format!(
                "INSERT INTO attendants (event_id, user_id) VALUES ($1, $2) \
                 RETURNING {ATTENDANT_COLUMNS}",
            ))
            .bind(event_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    GatewayError::InvalidRequest(format!(
                        "user {user_id} is already a participant of event {event_id}"
                    ))
                } else {
                    persistence_err(e)
                }
            })?;
            inserted.push(row_to_attendant(row));
        }

        tx.commit().await.map_err(persistence_err)?;
        Ok(inserted)
    }

    async fn check_in(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<CheckInOutcome, GatewayError> {
        // Conditional transition: exactly one concurrent caller can match
        // the IS NULL predicate.
        let updated = sqlx::query_as::<_, AttendantRow>(&format!(
            "UPDATE attendants SET checked_in_at = $3 \
             WHERE event_id = $1 AND user_id = $2 AND checked_in_at IS NULL \
             RETURNING {ATTENDANT_COLUMNS}",
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;

        if let Some(row) = updated {
            return Ok(CheckInOutcome::CheckedIn(row_to_attendant(row)));
        }

        // Lost the transition or never registered; a re-read tells which.
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendants WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence_err)?;

        if exists > 0 {
            Ok(CheckInOutcome::AlreadyCheckedIn)
        } else {
            Ok(CheckInOutcome::NotRegistered)
        }
    }

    async fn delete_one(&self, event_id: Uuid, user_id: Uuid) -> Result<u64, GatewayError> {
        let result = sqlx::query("DELETE FROM attendants WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, event_id: Uuid, user_ids: &[Uuid]) -> Result<u64, GatewayError> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result =
            sqlx::query("DELETE FROM attendants WHERE event_id = $1 AND user_id = ANY($2)")
                .bind(event_id)
                .bind(user_ids)
                .execute(&self.pool)
                .await
                .map_err(persistence_err)?;
        Ok(result.rows_affected())
    }
}
