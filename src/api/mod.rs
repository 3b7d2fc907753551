//! REST boundary: wire DTOs, the HTTP client and the backend trait the
//! view-model is written against.

use std::future::Future;

use crate::cancellation::{ReschedulePreview, RescheduleSummary};
use crate::error::ApiError;
use crate::models::{Appointment, DoctorShiftAssignment, ShiftTemplate};

pub mod client;
pub mod dto;

pub use client::ClinicClient;

/// The backend calls the schedule page depends on.
///
/// `ClinicClient` is the real implementation; tests substitute an in-memory one.
pub trait ScheduleBackend: Send + Sync {
    /// `GET /shifts`
    fn shift_templates(&self) -> impl Future<Output = Result<Vec<ShiftTemplate>, ApiError>> + Send;

    /// `GET /doctors/{id}/shifts`
    fn doctor_shifts(
        &self,
        doctor_id: i64,
    ) -> impl Future<Output = Result<Vec<DoctorShiftAssignment>, ApiError>> + Send;

    /// `GET /appointments?doctorId=&date=`
    fn appointments(
        &self,
        doctor_id: i64,
        date: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Appointment>, ApiError>> + Send;

    /// `GET /doctor-shifts/{id}/reschedule-preview`
    fn reschedule_preview(
        &self,
        assignment_id: i64,
    ) -> impl Future<Output = Result<ReschedulePreview, ApiError>> + Send;

    /// `POST /doctor-shifts/{id}/cancel-and-reschedule`
    fn cancel_and_reschedule(
        &self,
        assignment_id: i64,
        reason: &str,
    ) -> impl Future<Output = Result<RescheduleSummary, ApiError>> + Send;
}
