//! Request and response bodies for the attendant endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of a bulk-add request: emails to admit to the roster.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddParticipantsRequest {
    /// Directory emails of the users to add. Every email must resolve;
    /// one unknown address rejects the whole batch.
    pub emails: Vec<String>,
}

/// Body of a bulk-remove request: emails to drop from the roster.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RemoveParticipantsRequest {
    /// Directory emails of the participants to remove. Unresolvable or
    /// role-protected targets are skipped, not errors.
    pub emails: Vec<String>,
}

/// Outcome of a bulk-remove request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RemovedResponse {
    /// Number of roster rows actually deleted.
    pub removed: u64,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}
