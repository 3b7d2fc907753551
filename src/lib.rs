//! Doctor schedule view-model over a clinic REST API.
//!
//! The crate fetches a doctor's shift assignments, appointments and the
//! clinic's shift templates, normalizes them once at the API boundary and
//! projects them into a weekly grid. It also pre-checks offline bookings
//! against shift capacity and drives the cancel-and-reschedule flow for a
//! doctor's shift. All durable business rules stay in the backend.

pub mod api;
pub mod availability;
pub mod calendar;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod models;
pub mod projector;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ClinicClient, ScheduleBackend};
pub use calendar::{entries_for_slot, WeekGrid};
pub use config::ClientConfig;
pub use error::{ApiError, Notice};
pub use models::{
    Appointment, DoctorShiftAssignment, EntryKind, EntryStatus, PersonalScheduleEntry,
    ShiftTemplate,
};
pub use projector::project;
pub use session::AuthSession;
pub use view::{AutoRefresh, ScheduleView};
