//! Collaborator boundary: services this gateway consumes but does not own.
//!
//! Event and user CRUD, role assignment, mail transport, spreadsheet
//! parsing, and QR rendering all live elsewhere; the traits here pin down
//! exactly what the attendance engine needs from each of them. Production
//! implementations are in the submodules; tests substitute in-memory fakes.

pub mod email;
pub mod import;
pub mod postgres;
pub mod qr;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{EventRecord, EventRole, UserRecord};
use crate::error::GatewayError;

/// Read access to events.
#[async_trait]
pub trait EventGateway: Send + Sync + std::fmt::Debug {
    /// Looks an event up by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventRecord>, GatewayError>;

    /// Looks an event up by its opaque join token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn find_by_join_token(&self, token: &str) -> Result<Option<EventRecord>, GatewayError>;
}

/// Read access to the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Resolves one user by email.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, GatewayError>;

    /// Resolves every matching user for the given emails. Unknown emails
    /// are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn find_all_by_emails(&self, emails: &[String])
    -> Result<Vec<UserRecord>, GatewayError>;

    /// Resolves every matching user for the given ids.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn find_all_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, GatewayError>;
}

/// Per-event management role lookups.
#[async_trait]
pub trait RoleDirectory: Send + Sync + std::fmt::Debug {
    /// Returns the user's role for the event, or `None` for an ordinary
    /// participant.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn role_of(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<EventRole>, GatewayError>;

    /// Returns the roles of all given users for the event. Users without
    /// a role are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on lookup failure.
    async fn roles_for(
        &self,
        event_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EventRole>, GatewayError>;
}

/// Outbound join-notification mail. Strictly fire-and-forget from the
/// roster's perspective: failures are logged by the dispatcher, never
/// propagated.
#[async_trait]
pub trait EmailNotifier: Send + Sync + std::fmt::Debug {
    /// Sends one "you have been added to this event" notification.
    ///
    /// # Errors
    ///
    /// Returns the transport error; callers log and discard it.
    async fn send_join_notification(
        &self,
        user: &UserRecord,
        event: &EventRecord,
    ) -> anyhow::Result<()>;
}

/// Extracts candidate email strings from an uploaded roster file. Raw
/// spreadsheet parsing is out of scope; this boundary only promises a flat
/// list of strings, unvalidated.
pub trait FileImporter: Send + Sync + std::fmt::Debug {
    /// Extracts raw email candidates from the file bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload cannot be decoded at all.
    fn extract_emails(&self, bytes: &[u8]) -> anyhow::Result<Vec<String>>;
}

/// Renders a URL into a QR image.
pub trait QrEncoder: Send + Sync + std::fmt::Debug {
    /// Encodes `url` as a PNG image.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or rendering fails.
    fn encode(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}
