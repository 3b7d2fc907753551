//! Offline booking: doctor/shift availability and the pre-submit check.
//!
//! The backend reports, per doctor and shift on a date, how many bookings
//! exist and how many slots the shift has. A shift is full when
//! `current_bookings >= max_slots`. Doctors without a single open shift are
//! not offered at all; for an offered doctor, full shifts stay listed but
//! cannot be selected.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::ClinicClient;
use crate::calendar::DATE_FORMAT;
use crate::error::ApiError;
use crate::models::short_clock;

/// Capacity of one shift for one doctor on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftCapacity {
    pub shift_id: i64,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub current_bookings: u32,
    pub max_slots: u32,
}

impl ShiftCapacity {
    pub fn is_full(&self) -> bool {
        self.current_bookings >= self.max_slots
    }

    pub fn remaining(&self) -> u32 {
        self.max_slots.saturating_sub(self.current_bookings)
    }
}

/// A doctor and their shifts on the requested date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorAvailability {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub shifts: Vec<ShiftCapacity>,
}

impl DoctorAvailability {
    pub fn has_open_shift(&self) -> bool {
        self.shifts.iter().any(|s| !s.is_full())
    }

    pub fn shift(&self, shift_id: i64) -> Option<&ShiftCapacity> {
        self.shifts.iter().find(|s| s.shift_id == shift_id)
    }
}

/// Doctors with at least one open shift, in backend order.
pub fn selectable_doctors(doctors: Vec<DoctorAvailability>) -> Vec<DoctorAvailability> {
    doctors.into_iter().filter(|d| d.has_open_shift()).collect()
}

/// A shift as offered in the booking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftOption {
    pub shift_id: i64,
    pub label: String,
    pub remaining: u32,
    /// Full shifts are shown struck through and cannot be picked.
    pub disabled: bool,
}

/// Every shift of `doctor`, with full ones disabled.
pub fn shift_options(doctor: &DoctorAvailability) -> Vec<ShiftOption> {
    doctor
        .shifts
        .iter()
        .map(|shift| ShiftOption {
            shift_id: shift.shift_id,
            label: format!(
                "{} ({} - {})",
                shift.name,
                short_clock(&shift.start_time),
                short_clock(&shift.end_time)
            ),
            remaining: shift.remaining(),
            disabled: shift.is_full(),
        })
        .collect()
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub shift_id: i64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptom_initial: Option<String>,
}

impl BookingRequest {
    pub fn new(patient_id: i64, doctor_id: i64, shift_id: i64, date: NaiveDate) -> Self {
        BookingRequest {
            patient_id,
            doctor_id,
            shift_id,
            date: date.format(DATE_FORMAT).to_string(),
            symptom_initial: None,
        }
    }

    pub fn with_symptom(mut self, symptom: &str) -> Self {
        let symptom = symptom.trim();
        self.symptom_initial = (!symptom.is_empty()).then(|| symptom.to_string());
        self
    }
}

/// What the backend returns for a created booking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingConfirmation {
    #[serde(alias = "Id")]
    pub id: Option<i64>,
    #[serde(alias = "SlotNumber")]
    pub slot_number: Option<u32>,
    #[serde(alias = "Status")]
    pub status: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrecheckError {
    #[error("Doctor {0} has no open shift on this date")]
    DoctorUnavailable(i64),

    #[error("Doctor {doctor_id} is not on shift {shift_id} on this date")]
    UnknownShift { doctor_id: i64, shift_id: i64 },

    #[error("Shift {0} is full")]
    ShiftFull(i64),
}

/// Reject a booking locally before it reaches the backend.
///
/// `doctors` is the availability list for the booking's date.
pub fn precheck(
    request: &BookingRequest,
    doctors: &[DoctorAvailability],
) -> Result<(), PrecheckError> {
    let doctor = doctors
        .iter()
        .find(|d| d.doctor_id == request.doctor_id)
        .filter(|d| d.has_open_shift())
        .ok_or(PrecheckError::DoctorUnavailable(request.doctor_id))?;

    let shift = doctor
        .shift(request.shift_id)
        .ok_or(PrecheckError::UnknownShift {
            doctor_id: request.doctor_id,
            shift_id: request.shift_id,
        })?;

    if shift.is_full() {
        return Err(PrecheckError::ShiftFull(request.shift_id));
    }
    Ok(())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error(transparent)]
    Precheck(#[from] PrecheckError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Load availability, pre-check, then create the booking.
pub async fn book_with_precheck(
    client: &ClinicClient,
    request: &BookingRequest,
    specialty_id: i64,
) -> Result<BookingConfirmation, BookingError> {
    let doctors = client.doctor_availability(&request.date, specialty_id).await?;

    if let Err(error) = precheck(request, &doctors) {
        warn!(
            doctor_id = request.doctor_id,
            shift_id = request.shift_id,
            %error,
            "Booking refused before submission"
        );
        return Err(error.into());
    }

    let confirmation = client.create_appointment(request).await?;
    info!(
        doctor_id = request.doctor_id,
        shift_id = request.shift_id,
        slot_number = ?confirmation.slot_number,
        "Booking created"
    );
    Ok(confirmation)
}
