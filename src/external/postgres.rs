//! PostgreSQL-backed collaborator lookups.
//!
//! The gateway shares one database with the event-management system, so
//! the event, user, and role read models are plain queries against tables
//! owned by the external CRUD services (see `migrations/`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{EventGateway, RoleDirectory, UserDirectory};
use crate::domain::{EventFlag, EventRecord, EventRole, UnitSummary, UserRecord};
use crate::error::GatewayError;

fn persistence_err(e: sqlx::Error) -> GatewayError {
    GatewayError::PersistenceError(e.to_string())
}

/// Tuple shape fetched for event rows.
type EventRow = (
    Uuid,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<i64>,
    Option<String>,
    String,
);

const EVENT_COLUMNS: &str =
    "id, title, start_time, end_time, max_participants, status, join_token";

fn row_to_event(row: EventRow) -> EventRecord {
    let (id, title, start_time, end_time, max_participants, status, join_token) = row;
    let flag = match status.as_deref() {
        Some("CANCELLED") => Some(EventFlag::Cancelled),
        Some("COMPLETED") => Some(EventFlag::Completed),
        _ => None,
    };
    EventRecord {
        id,
        title,
        start_time,
        end_time,
        max_participants,
        flag,
        join_token,
    }
}

/// Tuple shape fetched for user rows with their optional unit summary.
type UserRow = (
    Uuid,
    String,
    String,
    Option<Uuid>,
    Option<String>,
    Option<String>,
);

const USER_SELECT: &str = "SELECT u.id, u.email, u.name, un.id, un.unit_name, un.unit_type \
     FROM users u LEFT JOIN units un ON un.id = u.unit_id";

fn row_to_user(row: UserRow) -> UserRecord {
    let (id, email, name, unit_id, unit_name, unit_type) = row;
    let unit = match (unit_id, unit_name) {
        (Some(uid), Some(uname)) => Some(UnitSummary {
            id: uid,
            unit_name: uname,
            unit_type,
        }),
        _ => None,
    };
    UserRecord {
        id,
        email,
        name,
        unit,
    }
}

/// Event lookups against the shared `events` table.
#[derive(Debug, Clone)]
pub struct PgEventGateway {
    pool: PgPool,
}

impl PgEventGateway {
    /// Creates a new gateway with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventGateway for PgEventGateway {
    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventRecord>, GatewayError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1",
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(row.map(row_to_event))
    }

    async fn find_by_join_token(&self, token: &str) -> Result<Option<EventRecord>, GatewayError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE join_token = $1",
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(row.map(row_to_event))
    }
}

/// User lookups against the shared `users`/`units` tables.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Creates a new directory with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, GatewayError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(row.map(row_to_user))
    }

    async fn find_all_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, GatewayError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let rows =
            sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.email = ANY($1)"))
                .bind(emails)
                .fetch_all(&self.pool)
                .await
                .map_err(persistence_err)?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }

    async fn find_all_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, GatewayError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence_err)?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }
}

/// Role lookups against the shared `event_managers` table.
#[derive(Debug, Clone)]
pub struct PgRoleDirectory {
    pool: PgPool,
}

impl PgRoleDirectory {
    /// Creates a new directory with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleDirectory for PgRoleDirectory {
    async fn role_of(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<EventRole>, GatewayError> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT role_type FROM event_managers WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(raw.as_deref().and_then(EventRole::from_str_opt))
    }

    async fn roles_for(
        &self,
        event_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EventRole>, GatewayError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT user_id, role_type FROM event_managers \
             WHERE event_id = $1 AND user_id = ANY($2)",
        )
        .bind(event_id)
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|(user_id, raw)| {
                EventRole::from_str_opt(&raw).map(|role| (user_id, role))
            })
            .collect())
    }
}
