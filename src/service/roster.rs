//! Roster administration: capacity-aware admission, bulk import,
//! role-authorized removal, and self-cancellation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use crate::domain::{
    Attendant, EventRecord, EventStatus, ImportSummary, ParticipantView, UserRecord,
};
use crate::error::GatewayError;
use crate::external::{
    EmailNotifier, EventGateway, FileImporter, QrEncoder, RoleDirectory, UserDirectory,
};
use crate::persistence::AttendantStore;

/// Simple `local-part@domain` filter applied to imported entries.
#[allow(clippy::expect_used)] // constant pattern
static EMAIL_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").expect("valid email pattern"));

/// Orchestrates all roster mutations except check-in.
///
/// Capacity is pre-checked here for an early, well-phrased conflict, but
/// the binding enforcement happens inside the store's atomic batch insert;
/// concurrent admissions can never push the roster over the ceiling.
/// Join-notification emails are dispatched per recipient as detached
/// tasks after the commit and never influence the call's outcome.
#[derive(Debug)]
pub struct RosterService {
    store: Arc<dyn AttendantStore>,
    users: Arc<dyn UserDirectory>,
    events: Arc<dyn EventGateway>,
    roles: Arc<dyn RoleDirectory>,
    mailer: Arc<dyn EmailNotifier>,
    importer: Arc<dyn FileImporter>,
    qr: Arc<dyn QrEncoder>,
    api_prefix: String,
}

impl RosterService {
    /// Creates a new roster service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn AttendantStore>,
        users: Arc<dyn UserDirectory>,
        events: Arc<dyn EventGateway>,
        roles: Arc<dyn RoleDirectory>,
        mailer: Arc<dyn EmailNotifier>,
        importer: Arc<dyn FileImporter>,
        qr: Arc<dyn QrEncoder>,
        api_prefix: String,
    ) -> Self {
        Self {
            store,
            users,
            events,
            roles,
            mailer,
            importer,
            qr,
            api_prefix,
        }
    }

    /// Returns the full roster for an event as participant views.
    /// Attendants whose user record has vanished from the directory are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn list_participants(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<ParticipantView>, GatewayError> {
        let attendants = self.store.list_by_event(event_id).await?;
        if attendants.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<Uuid> = attendants.iter().map(|a| a.user_id).collect();
        let user_map = self.user_map_by_ids(&user_ids).await?;

        Ok(attendants
            .iter()
            .filter_map(|attendant| {
                user_map
                    .get(&attendant.user_id)
                    .map(|user| ParticipantView::from_parts(attendant, user.clone()))
            })
            .collect())
    }

    /// Admits the given emails as participants of an event.
    ///
    /// All-or-nothing resolution: a single unknown email fails the whole
    /// batch. Already-registered users are deduplicated away. The batch is
    /// admitted only if it fits under the event's participant ceiling.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::EventNotFound`] — no such event.
    /// - [`GatewayError::EventNotOpen`] — event started or cancelled.
    /// - [`GatewayError::UserNotFound`] — an email with no matching user.
    /// - [`GatewayError::CapacityExceeded`] — batch would overflow the
    ///   ceiling; no rows are inserted.
    /// - [`GatewayError::PersistenceError`] — storage failure.
    pub async fn add_participants(
        &self,
        event_id: Uuid,
        emails: &[String],
        adder_email: &str,
    ) -> Result<Vec<ParticipantView>, GatewayError> {
        tracing::info!(
            adder = adder_email,
            count = emails.len(),
            %event_id,
            "adding participants"
        );

        let event = self.open_event_for_admission(event_id).await?;

        let unique_emails = dedup_preserving_order(emails);
        if unique_emails.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self.users.find_all_by_emails(&unique_emails).await?;
        if resolved.len() != unique_emails.len() {
            return Err(GatewayError::UserNotFound(
                "one or more emails do not exist in the directory".to_string(),
            ));
        }

        let existing = self.existing_participant_ids(event_id).await?;
        let new_users: Vec<UserRecord> = resolved
            .into_iter()
            .filter(|user| !existing.contains(&user.id))
            .collect();
        if new_users.is_empty() {
            tracing::info!(%event_id, "all requested users already participate");
            return Ok(Vec::new());
        }

        let inserted = self.admit(&event, &new_users).await?;
        self.dispatch_join_emails(&event, new_users.clone());

        let user_map: HashMap<Uuid, UserRecord> =
            new_users.into_iter().map(|u| (u.id, u)).collect();
        Ok(views_for(&inserted, &user_map))
    }

    /// Imports participants from an uploaded roster file.
    ///
    /// Rows are evaluated in file order: malformed entries, unknown
    /// emails, and already-registered users (including duplicates within
    /// the file) are counted and skipped, never errors. Only event-state
    /// preconditions and capacity overflow fail the call.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::EventNotFound`] — no such event.
    /// - [`GatewayError::EventNotOpen`] — event started or cancelled.
    /// - [`GatewayError::InvalidRequest`] — file cannot be decoded.
    /// - [`GatewayError::CapacityExceeded`] — new rows would overflow the
    ///   ceiling; nothing is admitted.
    /// - [`GatewayError::PersistenceError`] — storage failure.
    pub async fn import_participants(
        &self,
        event_id: Uuid,
        file_bytes: &[u8],
        manager_email: &str,
    ) -> Result<ImportSummary, GatewayError> {
        tracing::info!(manager = manager_email, %event_id, "importing participants");

        let event = self.open_event_for_admission(event_id).await?;

        let extracted = self
            .importer
            .extract_emails(file_bytes)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let total = extracted.len();

        let valid: Vec<String> = extracted
            .into_iter()
            .filter(|email| EMAIL_FORMAT.is_match(email))
            .collect();
        let invalid_format = total - valid.len();

        let resolved = self
            .users
            .find_all_by_emails(&dedup_preserving_order(&valid))
            .await?;
        let by_email: HashMap<&str, &UserRecord> =
            resolved.iter().map(|u| (u.email.as_str(), u)).collect();

        let existing = self.existing_participant_ids(event_id).await?;

        // File order decides how duplicates are classified: the first
        // occurrence is admitted, later ones count as already joined.
        let mut not_found_in_db = 0;
        let mut already_joined = 0;
        let mut admitted_ids: HashSet<Uuid> = HashSet::new();
        let mut new_users: Vec<UserRecord> = Vec::new();
        for email in &valid {
            match by_email.get(email.as_str()) {
                None => not_found_in_db += 1,
                Some(user) if existing.contains(&user.id) || admitted_ids.contains(&user.id) => {
                    already_joined += 1;
                }
                Some(user) => {
                    admitted_ids.insert(user.id);
                    new_users.push((*user).clone());
                }
            }
        }

        if !new_users.is_empty() {
            self.admit(&event, &new_users).await?;
            self.dispatch_join_emails(&event, new_users.clone());
        }

        let success = new_users.len();
        let skipped = invalid_format + not_found_in_db + already_joined;
        tracing::info!(%event_id, total, success, skipped, "import finished");

        Ok(ImportSummary {
            total,
            success,
            skipped,
            invalid_format,
            not_found_in_db,
            already_joined,
        })
    }

    /// Removes one participant unconditionally. Authorization is the
    /// HTTP layer's concern on this path.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RegistrationNotFound`] — no such participant.
    /// - [`GatewayError::PersistenceError`] — storage failure.
    pub async fn delete_participant(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), GatewayError> {
        let deleted = self.store.delete_one(event_id, user_id).await?;
        if deleted == 0 {
            return Err(GatewayError::RegistrationNotFound(
                "participant does not exist in this event".to_string(),
            ));
        }
        tracing::info!(%event_id, %user_id, "participant removed");
        Ok(())
    }

    /// Removes the given emails from the roster, filtered by the role
    /// hierarchy: a manager may remove anyone but another manager, staff
    /// may remove only ordinary participants, and a remover with no event
    /// role is unrestricted at this layer. Disallowed or unresolvable
    /// targets are logged and skipped; the call never fails because some
    /// targets were filtered out. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Unauthenticated`] — the remover does not exist.
    /// - [`GatewayError::PersistenceError`] — storage failure.
    pub async fn remove_participants_bulk(
        &self,
        event_id: Uuid,
        emails: &[String],
        remover_email: &str,
    ) -> Result<u64, GatewayError> {
        tracing::info!(
            remover = remover_email,
            count = emails.len(),
            %event_id,
            "bulk removal requested"
        );

        let remover = self
            .users
            .find_by_email(remover_email)
            .await?
            .ok_or_else(|| {
                GatewayError::Unauthenticated("acting user does not exist".to_string())
            })?;
        let remover_role = self.roles.role_of(event_id, remover.id).await?;

        let unique_emails = dedup_preserving_order(emails);
        if unique_emails.is_empty() {
            return Ok(0);
        }

        // Unresolvable emails drop out here, silently.
        let targets = self.users.find_all_by_emails(&unique_emails).await?;
        let target_ids: Vec<Uuid> = targets.iter().map(|u| u.id).collect();
        let target_roles = self.roles.roles_for(event_id, &target_ids).await?;

        let permitted: Vec<Uuid> = targets
            .iter()
            .filter(|target| {
                let target_role = target_roles.get(&target.id).copied();
                let allowed = remover_role.is_none_or(|role| role.may_remove(target_role));
                if !allowed {
                    tracing::warn!(
                        remover = remover_email,
                        target = %target.email,
                        ?remover_role,
                        ?target_role,
                        "removal target filtered out by role hierarchy"
                    );
                }
                allowed
            })
            .map(|target| target.id)
            .collect();

        if permitted.is_empty() {
            tracing::warn!(%event_id, "no removal target passed the role filter");
            return Ok(0);
        }

        let deleted = self.store.delete_many(event_id, &permitted).await?;
        tracing::info!(
            %event_id,
            deleted,
            requested = unique_emails.len(),
            "bulk removal finished"
        );
        Ok(deleted)
    }

    /// Cancels the caller's own registration. Allowed only while the
    /// event's derived status is still upcoming.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UserNotFound`] / [`GatewayError::EventNotFound`].
    /// - [`GatewayError::NotUpcoming`] — the event is ongoing, completed,
    ///   or cancelled.
    /// - [`GatewayError::RegistrationNotFound`] — the caller never joined.
    /// - [`GatewayError::PersistenceError`] — storage failure.
    pub async fn cancel_my_registration(
        &self,
        event_id: Uuid,
        user_email: &str,
    ) -> Result<(), GatewayError> {
        let user = self
            .users
            .find_by_email(user_email)
            .await?
            .ok_or_else(|| GatewayError::UserNotFound(user_email.to_string()))?;

        let event = self.event_by_id(event_id).await?;
        if event.display_status(Utc::now()) != EventStatus::Upcoming {
            tracing::warn!(email = user_email, %event_id, "self-cancel outside upcoming window");
            return Err(GatewayError::NotUpcoming);
        }

        let deleted = self.store.delete_one(event_id, user.id).await?;
        if deleted == 0 {
            return Err(GatewayError::RegistrationNotFound(
                "you are not registered for this event".to_string(),
            ));
        }
        tracing::info!(email = user_email, event = %event.title, "registration cancelled");
        Ok(())
    }

    /// Renders the event's check-in URL (API prefix + join token) as a
    /// PNG QR image.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::EventNotFound`] — no such event.
    /// - [`GatewayError::Internal`] — QR rendering failure.
    pub async fn check_in_qr(&self, event_id: Uuid) -> Result<Vec<u8>, GatewayError> {
        let event = self.event_by_id(event_id).await?;
        let url = format!(
            "{}/attendants/check-in/{}",
            self.api_prefix, event.join_token
        );
        tracing::debug!(%event_id, url, "rendering check-in QR");
        self.qr
            .encode(&url)
            .map_err(|e| GatewayError::Internal(format!("qr rendering failed: {e}")))
    }

    async fn event_by_id(&self, event_id: Uuid) -> Result<EventRecord, GatewayError> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| GatewayError::EventNotFound(format!("no event with id {event_id}")))
    }

    /// Loads the event and verifies participants may still be admitted.
    async fn open_event_for_admission(
        &self,
        event_id: Uuid,
    ) -> Result<EventRecord, GatewayError> {
        let event = self.event_by_id(event_id).await?;
        let now = Utc::now();
        if event.has_started(now) {
            tracing::warn!(%event_id, "admission rejected: event already started");
            return Err(GatewayError::EventNotOpen(
                "the event has already started or ended".to_string(),
            ));
        }
        if event.is_cancelled() {
            tracing::warn!(%event_id, "admission rejected: event cancelled");
            return Err(GatewayError::EventNotOpen(
                "the event has been cancelled".to_string(),
            ));
        }
        Ok(event)
    }

    async fn existing_participant_ids(
        &self,
        event_id: Uuid,
    ) -> Result<HashSet<Uuid>, GatewayError> {
        Ok(self
            .store
            .list_by_event(event_id)
            .await?
            .into_iter()
            .map(|a| a.user_id)
            .collect())
    }

    /// Pre-checks capacity for an early conflict, then inserts through
    /// the store, which re-evaluates the ceiling atomically.
    async fn admit(
        &self,
        event: &EventRecord,
        new_users: &[UserRecord],
    ) -> Result<Vec<Attendant>, GatewayError> {
        if let Some(max) = event.max_participants {
            let current = self.store.count_by_event(event.id).await?;
            let added = i64::try_from(new_users.len()).unwrap_or(i64::MAX);
            if current.saturating_add(added) > max {
                tracing::warn!(event_id = %event.id, current, added, max, "capacity exceeded");
                return Err(GatewayError::CapacityExceeded);
            }
        }
        let user_ids: Vec<Uuid> = new_users.iter().map(|u| u.id).collect();
        let inserted = self
            .store
            .insert_many(event.id, &user_ids, event.max_participants)
            .await?;
        tracing::info!(event_id = %event.id, count = inserted.len(), "participants admitted");
        Ok(inserted)
    }

    /// Fire-and-forget join notifications, one detached task per
    /// recipient. Failures are logged and isolated; the committed roster
    /// change is never affected.
    fn dispatch_join_emails(&self, event: &EventRecord, recipients: Vec<UserRecord>) {
        for recipient in recipients {
            let mailer = Arc::clone(&self.mailer);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = mailer.send_join_notification(&recipient, &event).await {
                    tracing::error!(
                        email = %recipient.email,
                        event = %event.title,
                        error = %e,
                        "join notification failed"
                    );
                }
            });
        }
    }

    async fn user_map_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, UserRecord>, GatewayError> {
        Ok(self
            .users
            .find_all_by_ids(ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }
}

fn dedup_preserving_order(emails: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    emails
        .iter()
        .filter(|email| seen.insert(email.as_str()))
        .cloned()
        .collect()
}

fn views_for(
    attendants: &[Attendant],
    users: &HashMap<Uuid, UserRecord>,
) -> Vec<ParticipantView> {
    attendants
        .iter()
        .filter_map(|attendant| {
            users
                .get(&attendant.user_id)
                .map(|user| ParticipantView::from_parts(attendant, user.clone()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::domain::EventRole;
    use crate::external::import::DelimitedTextImporter;
    use crate::service::testing::{
        MemoryStore, RecordingMailer, StaticEvents, StaticRoles, StaticUsers, StubQr,
        cancelled_event, started_event, upcoming_event, user,
    };

    struct Fixture {
        service: RosterService,
        store: Arc<MemoryStore>,
        emails_rx: mpsc::UnboundedReceiver<String>,
    }

    fn fixture(
        users: Vec<UserRecord>,
        events: Vec<EventRecord>,
        roles: Vec<(Uuid, Uuid, EventRole)>,
    ) -> Fixture {
        fixture_with_mailer(users, events, roles, false)
    }

    fn fixture_with_mailer(
        users: Vec<UserRecord>,
        events: Vec<EventRecord>,
        roles: Vec<(Uuid, Uuid, EventRole)>,
        failing_mailer: bool,
    ) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let (mailer, emails_rx) = if failing_mailer {
            RecordingMailer::failing()
        } else {
            RecordingMailer::new()
        };
        let service = RosterService::new(
            Arc::clone(&store) as Arc<dyn AttendantStore>,
            Arc::new(StaticUsers::with(users)),
            Arc::new(StaticEvents::with(events)),
            Arc::new(StaticRoles::with(roles)),
            mailer,
            Arc::new(DelimitedTextImporter),
            Arc::new(StubQr),
            "https://events.example.com/api/v1".to_string(),
        );
        Fixture {
            service,
            store,
            emails_rx,
        }
    }

    fn emails(users: &[&UserRecord]) -> Vec<String> {
        users.iter().map(|u| u.email.clone()).collect()
    }

    #[tokio::test]
    async fn add_admits_new_users_and_sends_emails() {
        let (a, b) = (user("a@x.com"), user("b@x.com"));
        let event = upcoming_event(None);
        let mut fx = fixture(vec![a.clone(), b.clone()], vec![event.clone()], vec![]);

        let views = fx
            .service
            .add_participants(event.id, &emails(&[&a, &b]), "mgr@x.com")
            .await
            .unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 2);

        let mut notified = Vec::new();
        for _ in 0..2 {
            let email = timeout(StdDuration::from_secs(1), fx.emails_rx.recv())
                .await
                .unwrap()
                .unwrap();
            notified.push(email);
        }
        notified.sort();
        assert_eq!(notified, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn add_is_all_or_nothing_on_unknown_email() {
        let a = user("a@x.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);

        let err = fx
            .service
            .add_participants(
                event.id,
                &[a.email.clone(), "ghost@x.com".to_string()],
                "mgr@x.com",
            )
            .await;
        assert!(matches!(err, Err(GatewayError::UserNotFound(_))));
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn add_rejects_started_event() {
        let a = user("a@x.com");
        let event = started_event();
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);

        let err = fx
            .service
            .add_participants(event.id, &emails(&[&a]), "mgr@x.com")
            .await;
        assert!(matches!(err, Err(GatewayError::EventNotOpen(_))));
    }

    #[tokio::test]
    async fn add_rejects_cancelled_event() {
        let a = user("a@x.com");
        let event = cancelled_event();
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);

        let err = fx
            .service
            .add_participants(event.id, &emails(&[&a]), "mgr@x.com")
            .await;
        assert!(matches!(err, Err(GatewayError::EventNotOpen(_))));
    }

    #[tokio::test]
    async fn add_over_capacity_rejects_whole_batch() {
        let (a, b, c) = (user("a@x.com"), user("b@x.com"), user("c@x.com"));
        let event = upcoming_event(Some(2));
        let fx = fixture(
            vec![a.clone(), b.clone(), c.clone()],
            vec![event.clone()],
            vec![],
        );

        let err = fx
            .service
            .add_participants(event.id, &emails(&[&a, &b, &c]), "mgr@x.com")
            .await;
        assert!(matches!(err, Err(GatewayError::CapacityExceeded)));
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn add_deduplicates_existing_participants() {
        let (a, b) = (user("a@x.com"), user("b@x.com"));
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone(), b.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, a.id).await;

        let views = fx
            .service
            .add_participants(event.id, &emails(&[&a, &b]), "mgr@x.com")
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views.first().unwrap().user.id, b.id);
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn add_with_empty_input_is_a_no_op() {
        let event = upcoming_event(None);
        let fx = fixture(vec![], vec![event.clone()], vec![]);
        let views = fx
            .service
            .add_participants(event.id, &[], "mgr@x.com")
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn add_survives_mailer_failure() {
        let a = user("a@x.com");
        let event = upcoming_event(None);
        let mut fx =
            fixture_with_mailer(vec![a.clone()], vec![event.clone()], vec![], true);

        let views = fx
            .service
            .add_participants(event.id, &emails(&[&a]), "mgr@x.com")
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 1);

        // The attempt was made even though it failed.
        let attempted = timeout(StdDuration::from_secs(1), fx.emails_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attempted, "a@x.com");
    }

    #[tokio::test]
    async fn concurrent_adds_never_exceed_capacity() {
        let (a, b) = (user("a@x.com"), user("b@x.com"));
        let event = upcoming_event(Some(1));
        let fx = fixture(vec![a.clone(), b.clone()], vec![event.clone()], vec![]);
        let service = Arc::new(fx.service);

        let mut handles = Vec::new();
        for target in [a.clone(), b.clone()] {
            let service = Arc::clone(&service);
            let event_id = event.id;
            handles.push(tokio::spawn(async move {
                service
                    .add_participants(event_id, &[target.email.clone()], "mgr@x.com")
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn import_counts_each_skip_reason() {
        let known = user("x@y.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![known.clone()], vec![event.clone()], vec![]);

        let file = b"bad@\nx@y.com\nx@y.com\nunknown@y.com";
        let summary = fx
            .service
            .import_participants(event.id, file, "mgr@x.com")
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                total: 4,
                success: 1,
                skipped: 3,
                invalid_format: 1,
                not_found_in_db: 1,
                already_joined: 1,
            }
        );
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn import_counts_preexisting_participants_as_already_joined() {
        let known = user("x@y.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![known.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, known.id).await;

        let summary = fx
            .service
            .import_participants(event.id, b"x@y.com", "mgr@x.com")
            .await
            .unwrap();
        assert_eq!(summary.success, 0);
        assert_eq!(summary.already_joined, 1);
    }

    #[tokio::test]
    async fn import_over_capacity_is_a_hard_failure() {
        let (a, b) = (user("a@x.com"), user("b@x.com"));
        let event = upcoming_event(Some(1));
        let fx = fixture(vec![a.clone(), b.clone()], vec![event.clone()], vec![]);

        let err = fx
            .service
            .import_participants(event.id, b"a@x.com\nb@x.com", "mgr@x.com")
            .await;
        assert!(matches!(err, Err(GatewayError::CapacityExceeded)));
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_rejects_started_event() {
        let event = started_event();
        let fx = fixture(vec![], vec![event.clone()], vec![]);
        let err = fx
            .service
            .import_participants(event.id, b"a@x.com", "mgr@x.com")
            .await;
        assert!(matches!(err, Err(GatewayError::EventNotOpen(_))));
    }

    #[tokio::test]
    async fn import_with_no_valid_rows_only_counts_skips() {
        let event = upcoming_event(None);
        let fx = fixture(vec![], vec![event.clone()], vec![]);
        let summary = fx
            .service
            .import_participants(event.id, b"not-an-email\n@nope", "mgr@x.com")
            .await
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.success, 0);
        assert_eq!(summary.invalid_format, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn delete_participant_missing_row_is_not_found() {
        let event = upcoming_event(None);
        let fx = fixture(vec![], vec![event.clone()], vec![]);
        let err = fx
            .service
            .delete_participant(event.id, Uuid::new_v4())
            .await;
        assert!(matches!(err, Err(GatewayError::RegistrationNotFound(_))));
    }

    #[tokio::test]
    async fn delete_participant_removes_the_row() {
        let a = user("a@x.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, a.id).await;

        fx.service.delete_participant(event.id, a.id).await.unwrap();
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn manager_removes_staff_and_plain_but_not_manager() {
        let remover = user("mgr@x.com");
        let (mgr2, staff, plain) = (user("m2@x.com"), user("s@x.com"), user("p@x.com"));
        let event = upcoming_event(None);
        let fx = fixture(
            vec![remover.clone(), mgr2.clone(), staff.clone(), plain.clone()],
            vec![event.clone()],
            vec![
                (event.id, remover.id, EventRole::Manage),
                (event.id, mgr2.id, EventRole::Manage),
                (event.id, staff.id, EventRole::Staff),
            ],
        );
        for target in [&mgr2, &staff, &plain] {
            fx.store.seed(event.id, target.id).await;
        }

        let deleted = fx
            .service
            .remove_participants_bulk(
                event.id,
                &emails(&[&mgr2, &staff, &plain]),
                &remover.email,
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining = fx.store.list_by_event(event.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.first().unwrap().user_id, mgr2.id);
    }

    #[tokio::test]
    async fn staff_removes_only_plain_participants() {
        let remover = user("staff@x.com");
        let (other_staff, plain) = (user("s2@x.com"), user("p@x.com"));
        let event = upcoming_event(None);
        let fx = fixture(
            vec![remover.clone(), other_staff.clone(), plain.clone()],
            vec![event.clone()],
            vec![
                (event.id, remover.id, EventRole::Staff),
                (event.id, other_staff.id, EventRole::Staff),
            ],
        );
        for target in [&other_staff, &plain] {
            fx.store.seed(event.id, target.id).await;
        }

        let deleted = fx
            .service
            .remove_participants_bulk(event.id, &emails(&[&other_staff, &plain]), &remover.email)
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = fx.store.list_by_event(event.id).await.unwrap();
        assert_eq!(remaining.first().unwrap().user_id, other_staff.id);
    }

    #[tokio::test]
    async fn remover_without_role_is_unrestricted_here() {
        let remover = user("nobody@x.com");
        let (mgr, plain) = (user("m@x.com"), user("p@x.com"));
        let event = upcoming_event(None);
        let fx = fixture(
            vec![remover.clone(), mgr.clone(), plain.clone()],
            vec![event.clone()],
            vec![(event.id, mgr.id, EventRole::Manage)],
        );
        for target in [&mgr, &plain] {
            fx.store.seed(event.id, target.id).await;
        }

        let deleted = fx
            .service
            .remove_participants_bulk(event.id, &emails(&[&mgr, &plain]), &remover.email)
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn unknown_remover_is_unauthenticated() {
        let event = upcoming_event(None);
        let fx = fixture(vec![], vec![event.clone()], vec![]);
        let err = fx
            .service
            .remove_participants_bulk(event.id, &["p@x.com".to_string()], "ghost@x.com")
            .await;
        assert!(matches!(err, Err(GatewayError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn unresolvable_removal_targets_are_dropped_silently() {
        let remover = user("mgr@x.com");
        let plain = user("p@x.com");
        let event = upcoming_event(None);
        let fx = fixture(
            vec![remover.clone(), plain.clone()],
            vec![event.clone()],
            vec![(event.id, remover.id, EventRole::Manage)],
        );
        fx.store.seed(event.id, plain.id).await;

        let deleted = fx
            .service
            .remove_participants_bulk(
                event.id,
                &[plain.email.clone(), "ghost@x.com".to_string()],
                &remover.email,
            )
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn cancel_upcoming_registration_succeeds() {
        let a = user("a@x.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, a.id).await;

        fx.service
            .cancel_my_registration(event.id, &a.email)
            .await
            .unwrap();
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancel_outside_upcoming_window_conflicts() {
        let a = user("a@x.com");
        let event = started_event();
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, a.id).await;

        let err = fx.service.cancel_my_registration(event.id, &a.email).await;
        assert!(matches!(err, Err(GatewayError::NotUpcoming)));
        assert_eq!(fx.store.count_by_event(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancel_without_registration_is_not_found() {
        let a = user("a@x.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);

        let err = fx.service.cancel_my_registration(event.id, &a.email).await;
        assert!(matches!(err, Err(GatewayError::RegistrationNotFound(_))));
    }

    #[tokio::test]
    async fn list_returns_views_with_users() {
        let (a, b) = (user("a@x.com"), user("b@x.com"));
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone(), b.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, a.id).await;
        fx.store.seed(event.id, b.id).await;

        let views = fx.service.list_participants(event.id).await.unwrap();
        assert_eq!(views.len(), 2);
        let mut seen: Vec<Uuid> = views.iter().map(|v| v.user.id).collect();
        seen.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn list_skips_attendants_with_vanished_users() {
        let a = user("a@x.com");
        let event = upcoming_event(None);
        let fx = fixture(vec![a.clone()], vec![event.clone()], vec![]);
        fx.store.seed(event.id, a.id).await;
        fx.store.seed(event.id, Uuid::new_v4()).await;

        let views = fx.service.list_participants(event.id).await.unwrap();
        assert_eq!(views.len(), 1);
    }

    #[tokio::test]
    async fn qr_embeds_prefix_and_join_token() {
        let event = upcoming_event(None);
        let fx = fixture(vec![], vec![event.clone()], vec![]);

        let bytes = fx.service.check_in_qr(event.id).await.unwrap();
        let rendered = String::from_utf8(bytes).unwrap();
        assert_eq!(
            rendered,
            format!(
                "qr:https://events.example.com/api/v1/attendants/check-in/{}",
                event.join_token
            )
        );
    }

    #[tokio::test]
    async fn qr_for_unknown_event_is_not_found() {
        let fx = fixture(vec![], vec![], vec![]);
        let err = fx.service.check_in_qr(Uuid::new_v4()).await;
        assert!(matches!(err, Err(GatewayError::EventNotFound(_))));
    }
}
