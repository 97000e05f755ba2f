//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::external::{RoleDirectory, UserDirectory};
use crate::hub::NotificationHub;
use crate::service::{CheckInService, RosterService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Check-in engine.
    pub check_in_service: Arc<CheckInService>,
    /// Roster administration service.
    pub roster_service: Arc<RosterService>,
    /// Live notification fan-out, shared with the check-in engine.
    pub hub: Arc<NotificationHub>,
    /// User directory, used by the auth boundary.
    pub users: Arc<dyn UserDirectory>,
    /// Per-event role directory, used by the auth boundary.
    pub roles: Arc<dyn RoleDirectory>,
}
