//! Data models for the doctor schedule view.
//!
//! This module defines the core data structures used throughout the crate:
//! - ShiftTemplate: clinic-defined time window, independent of any date
//! - DoctorShiftAssignment: a doctor bound to a template on a given date
//! - Appointment: a patient booking as reported by the backend
//! - PersonalScheduleEntry: the flattened row the calendar renders
//! - HourSpan: whole-hour range used to bucket entries into templates
//!
//! Everything here is already normalized. Wire shapes live in `api::dto`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building models by hand.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Shift name cannot be empty")]
    EmptyShiftName,

    #[error("Invalid clock value: '{0}'. Expected HH:MM or HH:MM:SS")]
    InvalidClock(String),
}

/// Truncate a backend date or timestamp to `YYYY-MM-DD`.
///
/// Handles `2024-05-06T08:00:00Z` and `2024-05-06 08:00:00` alike. Grouping
/// is plain string equality on the result, so no calendar validation is done.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let end = raw.find(|c| c == 'T' || c == ' ').unwrap_or(raw.len());
    raw[..end].to_string()
}

/// Render a backend clock (`8:00`, `08:00:00`) as `HH:MM`; other input is
/// returned trimmed.
pub fn short_clock(raw: &str) -> String {
    let raw = raw.trim();
    let mut parts = raw.split(':');
    let hour = parts.next().and_then(|h| h.trim().parse::<u32>().ok());
    match (hour, parts.next()) {
        (Some(hour), Some(minute))
            if minute.len() == 2 && minute.bytes().all(|b| b.is_ascii_digit()) =>
        {
            format!("{:02}:{}", hour, minute)
        }
        _ => raw.to_string(),
    }
}

fn parse_hour(clock: &str) -> Option<u32> {
    let hour = clock.trim().split(':').next()?.trim();
    if hour.is_empty() {
        return None;
    }
    hour.parse::<u32>().ok().filter(|h| *h <= 24)
}

/// A whole-hour interval `[start, end)`.
///
/// Minutes are truncated on parse, so `08:30` and `08:00` both start at 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourSpan {
    pub start: u32,
    pub end: u32,
}

impl HourSpan {
    /// Parse `"HH:MM - HH:MM"` or a single `"HH:MM"` (treated as one hour).
    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once('-') {
            Some((start, end)) => Self::between(start, end),
            None => {
                let start = parse_hour(text)?;
                Some(HourSpan {
                    start,
                    end: start + 1,
                })
            }
        }
    }

    /// Build a span from two separate clock strings.
    pub fn between(start: &str, end: &str) -> Option<Self> {
        Some(HourSpan {
            start: parse_hour(start)?,
            end: parse_hour(end)?,
        })
    }

    /// Half-open overlap: spans sharing only a boundary hour do not overlap.
    pub fn overlaps_with(&self, other: &HourSpan) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// A clinic-defined shift window such as "Morning 08:00 - 12:00".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftTemplate {
    pub id: i64,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
}

impl ShiftTemplate {
    /// Create a new shift template with validation.
    pub fn new(id: i64, name: &str, start_time: &str, end_time: &str) -> Result<Self, ModelError> {
        if name.trim().is_empty() {
            return Err(ModelError::EmptyShiftName);
        }
        for clock in [start_time, end_time] {
            if parse_hour(clock).is_none() {
                return Err(ModelError::InvalidClock(clock.to_string()));
            }
        }

        Ok(ShiftTemplate {
            id,
            name: name.trim().to_string(),
            start_time: start_time.trim().to_string(),
            end_time: end_time.trim().to_string(),
        })
    }

    pub fn hour_span(&self) -> Option<HourSpan> {
        HourSpan::between(&self.start_time, &self.end_time)
    }

    /// `"08:00 - 12:00"`, the same shape entry times use.
    pub fn time_label(&self) -> String {
        format!(
            "{} - {}",
            short_clock(&self.start_time),
            short_clock(&self.end_time)
        )
    }
}

/// Backend status of a doctor's duty assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentStatus {
    Active,
    Cancelled,
    Replaced,
    Other,
}

impl AssignmentStatus {
    /// Parse a backend status string. Case-insensitive; unknown values map to `Other`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "ACTIVE" => AssignmentStatus::Active,
            "CANCELLED" | "CANCELED" => AssignmentStatus::Cancelled,
            "REPLACED" => AssignmentStatus::Replaced,
            _ => AssignmentStatus::Other,
        }
    }
}

/// A doctor's duty on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorShiftAssignment {
    pub id: i64,
    pub doctor_id: Option<i64>,
    pub shift_id: Option<i64>,
    /// Normalized to `YYYY-MM-DD`.
    pub work_date: String,
    pub status: AssignmentStatus,
    /// Missing when the backend omitted the join; such records are not rendered.
    pub shift: Option<ShiftTemplate>,
}

/// Backend status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Waiting,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Other,
}

impl AppointmentStatus {
    /// Parse a backend status string. Case-insensitive; unknown values map to `Other`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "WAITING" => AppointmentStatus::Waiting,
            "CHECKED_IN" => AppointmentStatus::CheckedIn,
            "IN_PROGRESS" => AppointmentStatus::InProgress,
            "COMPLETED" => AppointmentStatus::Completed,
            "CANCELLED" | "CANCELED" => AppointmentStatus::Cancelled,
            "NO_SHOW" => AppointmentStatus::NoShow,
            _ => AppointmentStatus::Other,
        }
    }
}

/// A patient appointment, already reduced to one canonical shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: Option<i64>,
    /// Normalized to `YYYY-MM-DD`.
    pub date: String,
    /// `"HH:MM"` or `"HH:MM - HH:MM"`; `None` when the backend gave neither a time nor a shift.
    pub time: Option<String>,
    pub shift_id: Option<i64>,
    pub status: AppointmentStatus,
    pub patient_name: Option<String>,
    pub slot_number: Option<u32>,
    pub symptom: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Shift,
    Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Completed,
    Cancelled,
}

impl EntryStatus {
    pub fn name(&self) -> &str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Completed => "completed",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

impl From<AssignmentStatus> for EntryStatus {
    fn from(status: AssignmentStatus) -> Self {
        match status {
            AssignmentStatus::Cancelled => EntryStatus::Cancelled,
            _ => EntryStatus::Active,
        }
    }
}

impl From<AppointmentStatus> for EntryStatus {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Completed => EntryStatus::Completed,
            AppointmentStatus::Cancelled | AppointmentStatus::NoShow => EntryStatus::Cancelled,
            _ => EntryStatus::Active,
        }
    }
}

/// One row of a doctor's personal schedule. Rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalScheduleEntry {
    pub id: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub title: String,
    pub description: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_number: Option<u32>,
}

impl PersonalScheduleEntry {
    pub fn hour_span(&self) -> Option<HourSpan> {
        HourSpan::parse(&self.time)
    }
}
