//! Check-in engine: validates a join-token check-in request and performs
//! the one-way state transition.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::ParticipantView;
use crate::error::GatewayError;
use crate::external::{EventGateway, UserDirectory};
use crate::hub::{FrameKind, NotificationHub};
use crate::persistence::{AttendantStore, CheckInOutcome};

/// Orchestrates the check-in state transition.
///
/// The transition itself is delegated to the store's conditional update,
/// so two simultaneous check-ins for the same attendant yield exactly one
/// success and one conflict. The live frame is published strictly after
/// the successful commit, fire-and-forget.
#[derive(Debug)]
pub struct CheckInService {
    users: Arc<dyn UserDirectory>,
    events: Arc<dyn EventGateway>,
    store: Arc<dyn AttendantStore>,
    hub: Arc<NotificationHub>,
}

impl CheckInService {
    /// Creates a new check-in service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        events: Arc<dyn EventGateway>,
        store: Arc<dyn AttendantStore>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self {
            users,
            events,
            store,
            hub,
        }
    }

    /// Checks `user_email` in to the event identified by `join_token`.
    ///
    /// Returns the updated participant view. A second check-in for the
    /// same registration is rejected, not silently accepted.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UserNotFound`] — no user for the email.
    /// - [`GatewayError::EventNotFound`] — no event for the token.
    /// - [`GatewayError::RegistrationNotFound`] — user never joined.
    /// - [`GatewayError::AlreadyCheckedIn`] — `checked_in_at` already set.
    /// - [`GatewayError::PersistenceError`] — storage failure.
    pub async fn check_in(
        &self,
        join_token: &str,
        user_email: &str,
    ) -> Result<ParticipantView, GatewayError> {
        let user = self
            .users
            .find_by_email(user_email)
            .await?
            .ok_or_else(|| GatewayError::UserNotFound(user_email.to_string()))?;

        let event = self
            .events
            .find_by_join_token(join_token)
            .await?
            .ok_or_else(|| {
                GatewayError::EventNotFound("no event exists for this join token".to_string())
            })?;

        match self.store.check_in(event.id, user.id, Utc::now()).await? {
            CheckInOutcome::NotRegistered => Err(GatewayError::RegistrationNotFound(
                "you are not registered for this event".to_string(),
            )),
            CheckInOutcome::AlreadyCheckedIn => {
                tracing::warn!(
                    email = %user.email,
                    event = %event.title,
                    "repeat check-in attempt rejected"
                );
                Err(GatewayError::AlreadyCheckedIn)
            }
            CheckInOutcome::CheckedIn(attendant) => {
                tracing::info!(
                    email = %user.email,
                    user_id = %user.id,
                    event = %event.title,
                    event_id = %event.id,
                    "participant checked in"
                );
                let view = ParticipantView::from_parts(&attendant, user);
                self.hub
                    .publish(event.id, FrameKind::ParticipantCheckedIn, &view)
                    .await;
                Ok(view)
            }
        }
    }
}
