//! In-memory fakes for the store and collaborator traits.
//!
//! The memory store mirrors the Postgres store's atomicity guarantees by
//! doing each mutation under one mutex acquisition, which is what makes
//! the concurrency tests meaningful.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::domain::{Attendant, EventFlag, EventRecord, EventRole, UserRecord};
use crate::error::GatewayError;
use crate::external::{EmailNotifier, EventGateway, QrEncoder, RoleDirectory, UserDirectory};
use crate::persistence::{AttendantStore, CheckInOutcome};

pub(crate) fn user(email: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or("someone").to_string(),
        unit: None,
    }
}

pub(crate) fn upcoming_event(max_participants: Option<i64>) -> EventRecord {
    let now = Utc::now();
    EventRecord {
        id: Uuid::new_v4(),
        title: "all-hands".to_string(),
        start_time: now + Duration::hours(1),
        end_time: now + Duration::hours(2),
        max_participants,
        flag: None,
        join_token: Uuid::new_v4().to_string(),
    }
}

pub(crate) fn started_event() -> EventRecord {
    let mut event = upcoming_event(None);
    event.start_time = Utc::now() - Duration::minutes(30);
    event
}

pub(crate) fn cancelled_event() -> EventRecord {
    let mut event = upcoming_event(None);
    event.flag = Some(EventFlag::Cancelled);
    event
}

/// Mutex-guarded attendant store with the same atomicity contract as the
/// Postgres implementation.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<Vec<Attendant>>,
}

impl MemoryStore {
    /// Registers a participant directly, bypassing capacity checks.
    pub(crate) async fn seed(&self, event_id: Uuid, user_id: Uuid) -> DateTime<Utc> {
        let joined_at = Utc::now();
        self.rows.lock().await.push(Attendant {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            joined_at,
            checked_in_at: None,
        });
        joined_at
    }
}

#[async_trait]
impl AttendantStore for MemoryStore {
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Attendant>, GatewayError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn count_by_event(&self, event_id: Uuid) -> Result<i64, GatewayError> {
        let count = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.event_id == event_id)
            .count();
        Ok(count as i64)
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
        let mut rows = self.rows.lock().await;

        let current = rows.iter().filter(|row| row.event_id == event_id).count() as i64;
        if let Some(max) = max_participants
            && current + user_ids.len() as i64 > max
        {
            return Err(GatewayError::CapacityExceeded);
        }
        for user_id in user_ids {
            if rows
                .iter()
                .any(|row| row.event_id == event_id && row.user_id == *user_id)
            {
                return Err(GatewayError::InvalidRequest(format!(
                    "user {user_id} is already a participant of event {event_id}"
                )));
            }
        }

        let inserted: Vec<Attendant> = user_ids
            .iter()
            .map(|user_id| Attendant {
                id: Uuid::new_v4(),
                event_id,
                user_id: *user_id,
                joined_at: Utc::now(),
                checked_in_at: None,
            })
            .collect();
        rows.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn check_in(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<CheckInOutcome, GatewayError> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.event_id == event_id && row.user_id == user_id)
        else {
            return Ok(CheckInOutcome::NotRegistered);
        };
        if row.checked_in_at.is_some() {
            return Ok(CheckInOutcome::AlreadyCheckedIn);
        }
        row.checked_in_at = Some(at);
        Ok(CheckInOutcome::CheckedIn(row.clone()))
    }

    async fn delete_one(&self, event_id: Uuid, user_id: Uuid) -> Result<u64, GatewayError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| !(row.event_id == event_id && row.user_id == user_id));
        Ok((before - rows.len()) as u64)
    }

    async fn delete_many(&self, event_id: Uuid, user_ids: &[Uuid]) -> Result<u64, GatewayError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| !(row.event_id == event_id && user_ids.contains(&row.user_id)));
        Ok((before - rows.len()) as u64)
    }
}

/// Fixed set of users keyed by email and id.
#[derive(Debug)]
pub(crate) struct StaticUsers {
    users: Vec<UserRecord>,
}

impl StaticUsers {
    pub(crate) fn with(users: Vec<UserRecord>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, GatewayError> {
        Ok(self.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_all_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, GatewayError> {
        Ok(self
            .users
            .iter()
            .filter(|u| emails.contains(&u.email))
            .cloned()
            .collect())
    }

    async fn find_all_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, GatewayError> {
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

/// Fixed set of events keyed by id and join token.
#[derive(Debug)]
pub(crate) struct StaticEvents {
    events: Vec<EventRecord>,
}

impl StaticEvents {
    pub(crate) fn with(events: Vec<EventRecord>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventGateway for StaticEvents {
    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventRecord>, GatewayError> {
        Ok(self.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn find_by_join_token(&self, token: &str) -> Result<Option<EventRecord>, GatewayError> {
        Ok(self.events.iter().find(|e| e.join_token == token).cloned())
    }
}

/// Fixed per-event role assignments.
#[derive(Debug, Default)]
pub(crate) struct StaticRoles {
    roles: HashMap<(Uuid, Uuid), EventRole>,
}

impl StaticRoles {
    pub(crate) fn with(assignments: Vec<(Uuid, Uuid, EventRole)>) -> Self {
        Self {
            roles: assignments
                .into_iter()
                .map(|(event_id, user_id, role)| ((event_id, user_id), role))
                .collect(),
        }
    }
}

#[async_trait]
impl RoleDirectory for StaticRoles {
    async fn role_of(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<EventRole>, GatewayError> {
        Ok(self.roles.get(&(event_id, user_id)).copied())
    }

    async fn roles_for(
        &self,
        event_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EventRole>, GatewayError> {
        Ok(user_ids
            .iter()
            .filter_map(|user_id| {
                self.roles
                    .get(&(event_id, *user_id))
                    .map(|role| (*user_id, *role))
            })
            .collect())
    }
}

/// Mailer that records recipient emails on a channel. With `fail` set it
/// still records, then errors, so tests can assert failure isolation.
#[derive(Debug)]
pub(crate) struct RecordingMailer {
    sent: mpsc::UnboundedSender<String>,
    fail: bool,
}

impl RecordingMailer {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent: tx,
                fail: false,
            }),
            rx,
        )
    }

    pub(crate) fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent: tx,
                fail: true,
            }),
            rx,
        )
    }
}

#[async_trait]
impl EmailNotifier for RecordingMailer {
    async fn send_join_notification(
        &self,
        user: &UserRecord,
        _event: &EventRecord,
    ) -> anyhow::Result<()> {
        let _ = self.sent.send(user.email.clone());
        if self.fail {
            anyhow::bail!("smtp unavailable");
        }
        Ok(())
    }
}

/// QR encoder returning a fixed marker instead of a real image.
#[derive(Debug, Default)]
pub(crate) struct StubQr;

impl QrEncoder for StubQr {
    fn encode(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        Ok(format!("qr:{url}").into_bytes())
    }
}
