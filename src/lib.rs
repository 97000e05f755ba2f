//! # attendance-gateway
//!
//! REST gateway for live event attendance: join-token check-in with
//! server-sent check-in notifications, capacity-bounded roster
//! administration, bulk import, and role-tiered removal.
//!
//! Users, events, and role assignments are owned by neighbouring
//! services; this gateway holds the attendance records and reads the
//! rest through narrow collaborator traits.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, SSE)
//!     │
//!     ├── REST Handlers + Auth boundary (api/)
//!     │
//!     ├── CheckInService / RosterService (service/)
//!     ├── NotificationHub (hub)
//!     │
//!     ├── AttendantStore (persistence/) ── PostgreSQL
//!     └── Collaborators (external/): event + user + role directories,
//!         SMTP notifier, file importer, QR renderer
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod external;
pub mod hub;
pub mod persistence;
pub mod service;
