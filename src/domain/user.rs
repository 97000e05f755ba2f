//! Users, organizational units, and per-event management roles.
//!
//! User CRUD and authentication live outside this service; these are the
//! read models behind [`crate::external::UserDirectory`] and
//! [`crate::external::RoleDirectory`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Summary of the organizational unit a user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    /// Unit identifier.
    pub id: Uuid,
    /// Display name.
    pub unit_name: String,
    /// Free-form unit type label.
    pub unit_type: Option<String>,
}

/// A user as embedded in participant views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// User identifier.
    pub id: Uuid,
    /// Login email, unique across the directory.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Organizational unit, if assigned.
    pub unit: Option<UnitSummary>,
}

/// Per-event management role. `Manage` outranks `Staff`; an absent role
/// means ordinary participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventRole {
    /// Full control over the event's roster.
    Manage,
    /// Day-of-event staff: may administer ordinary participants.
    Staff,
}

impl EventRole {
    /// Parses the role from its storage representation.
    #[must_use]
    pub fn from_str_opt(raw: &str) -> Option<Self> {
        match raw {
            "MANAGE" => Some(Self::Manage),
            "STAFF" => Some(Self::Staff),
            _ => None,
        }
    }

    /// Storage representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manage => "MANAGE",
            Self::Staff => "STAFF",
        }
    }

    /// Whether a remover holding this role may remove a target with
    /// `target_role` from the roster.
    ///
    /// `Manage` removes anyone but another manager; `Staff` removes only
    /// ordinary participants.
    #[must_use]
    pub fn may_remove(self, target_role: Option<Self>) -> bool {
        match self {
            Self::Manage => !matches!(target_role, Some(Self::Manage)),
            Self::Staff => target_role.is_none(),
        }
    }
}
