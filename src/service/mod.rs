//! Service layer: the attendance lifecycle engine.
//!
//! [`CheckInService`] owns the one-way check-in transition and is the
//! only publisher of live frames, strictly after a successful commit.
//! [`RosterService`] owns capacity-aware admission, bulk import, and
//! role-authorized removal. Both orchestrate the store and the
//! collaborator traits behind [`crate::external`].

pub mod checkin;
pub mod roster;

#[cfg(test)]
pub(crate) mod testing;

pub use checkin::CheckInService;
pub use roster::RosterService;
