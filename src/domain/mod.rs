//! Domain layer: attendance records, events with derived status, users,
//! and per-event roles.
//!
//! Everything in this module is plain data plus pure functions; all I/O
//! lives behind the persistence and collaborator traits.

pub mod attendant;
pub mod event;
pub mod user;

pub use attendant::{Attendant, ImportSummary, ParticipantView};
pub use event::{EventFlag, EventRecord, EventStatus};
pub use user::{EventRole, UnitSummary, UserRecord};
