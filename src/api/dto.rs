//! Wire shapes returned by the backend and their normalization.
//!
//! The backend mixes camelCase fields with legacy capitalized aliases
//! (`WorkDate`, `Patient.User.fullName`) and sometimes sends numbers as
//! strings. Everything is folded into the canonical `models` types here, once,
//! so nothing downstream branches on shape. List rows are decoded one by one:
//! a malformed row is logged and skipped, the rest of the list survives.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::availability::{DoctorAvailability, ShiftCapacity};
use crate::models::{
    normalize_date, short_clock, Appointment, AppointmentStatus, AssignmentStatus,
    DoctorShiftAssignment, ShiftTemplate,
};

/// `{ success, data, message, code }`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
    pub message: Option<String>,
    pub code: Option<String>,
}

/// List endpoints that may answer with either a bare array or an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped(Envelope<Vec<T>>),
}

/// Error body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

/// Integers arrive as JSON numbers from most endpoints and as strings from a few.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireInt {
    Number(i64),
    Text(String),
}

impl WireInt {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            WireInt::Number(n) => Some(*n),
            WireInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn id_of(id: &Option<WireInt>) -> Option<i64> {
    id.as_ref().and_then(WireInt::as_i64)
}

fn count_of(value: &Option<WireInt>) -> Option<u32> {
    id_of(value).and_then(|n| u32::try_from(n).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decode each row on its own, skipping the ones that do not fit `T`.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Vec<T> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(error) => {
                warn!(index, what, %error, "Skipping malformed row");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShiftTemplate {
    #[serde(alias = "Id")]
    pub id: Option<WireInt>,
    #[serde(alias = "Name")]
    pub name: Option<String>,
    #[serde(alias = "StartTime")]
    pub start_time: Option<String>,
    #[serde(alias = "EndTime")]
    pub end_time: Option<String>,
}

impl RawShiftTemplate {
    /// `None` unless id, start and end are all present.
    pub fn normalize(self) -> Option<ShiftTemplate> {
        Some(ShiftTemplate {
            id: id_of(&self.id)?,
            name: non_empty(self.name).unwrap_or_default(),
            start_time: non_empty(self.start_time)?,
            end_time: non_empty(self.end_time)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShiftAssignment {
    #[serde(alias = "Id")]
    pub id: Option<WireInt>,
    #[serde(alias = "DoctorId")]
    pub doctor_id: Option<WireInt>,
    #[serde(alias = "ShiftId")]
    pub shift_id: Option<WireInt>,
    #[serde(alias = "WorkDate")]
    pub work_date: Option<String>,
    #[serde(alias = "Status")]
    pub status: Option<String>,
    #[serde(alias = "Shift")]
    pub shift: Option<RawShiftTemplate>,
}

impl RawShiftAssignment {
    /// `None` only when the record has no usable id. A missing nested shift
    /// is kept as `shift: None`; the projector decides what to do with it.
    pub fn normalize(self) -> Option<DoctorShiftAssignment> {
        let id = id_of(&self.id)?;
        let shift = self.shift.and_then(RawShiftTemplate::normalize);
        Some(DoctorShiftAssignment {
            id,
            doctor_id: id_of(&self.doctor_id),
            shift_id: id_of(&self.shift_id).or(shift.as_ref().map(|s| s.id)),
            work_date: self.work_date.as_deref().map(normalize_date).unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .map(AssignmentStatus::from_wire)
                .unwrap_or(AssignmentStatus::Active),
            shift,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(alias = "FullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPatient {
    #[serde(alias = "FullName")]
    pub full_name: Option<String>,
    pub user: Option<RawUser>,
    #[serde(rename = "User")]
    pub legacy_user: Option<RawUser>,
}

impl RawPatient {
    fn user_name(&self) -> Option<String> {
        [&self.user, &self.legacy_user]
            .into_iter()
            .flatten()
            .find_map(|u| non_empty(u.full_name.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppointment {
    #[serde(alias = "Id")]
    pub id: Option<WireInt>,
    #[serde(alias = "DoctorId")]
    pub doctor_id: Option<WireInt>,
    #[serde(alias = "Date", alias = "appointmentDate")]
    pub date: Option<String>,
    #[serde(alias = "AppointmentTime")]
    pub appointment_time: Option<String>,
    #[serde(alias = "ShiftId")]
    pub shift_id: Option<WireInt>,
    #[serde(alias = "Shift")]
    pub shift: Option<RawShiftTemplate>,
    #[serde(alias = "Status")]
    pub status: Option<String>,
    #[serde(alias = "PatientName")]
    pub patient_name: Option<String>,
    pub patient: Option<RawPatient>,
    #[serde(rename = "Patient")]
    pub legacy_patient: Option<RawPatient>,
    #[serde(alias = "SlotNumber")]
    pub slot_number: Option<WireInt>,
    #[serde(alias = "SymptomInitial")]
    pub symptom_initial: Option<String>,
}

impl RawAppointment {
    /// Patient name by precedence: `patientName`, `patient.user.fullName`,
    /// `Patient.User.fullName`, `patient.fullName`, `Patient.fullName`.
    fn resolve_patient_name(&mut self) -> Option<String> {
        let patient = self.patient.take().unwrap_or_default();
        let legacy = self.legacy_patient.take().unwrap_or_default();
        non_empty(self.patient_name.take())
            .or_else(|| patient.user_name())
            .or_else(|| legacy.user_name())
            .or_else(|| non_empty(patient.full_name))
            .or_else(|| non_empty(legacy.full_name))
    }

    pub fn normalize(mut self) -> Option<Appointment> {
        let id = id_of(&self.id)?;
        let patient_name = self.resolve_patient_name();
        let shift = self.shift.take().and_then(RawShiftTemplate::normalize);
        let time = non_empty(self.appointment_time).or_else(|| {
            shift.as_ref().map(|s| {
                format!("{} - {}", short_clock(&s.start_time), short_clock(&s.end_time))
            })
        });

        Some(Appointment {
            id,
            doctor_id: id_of(&self.doctor_id),
            date: self.date.as_deref().map(normalize_date).unwrap_or_default(),
            time,
            shift_id: id_of(&self.shift_id).or(shift.as_ref().map(|s| s.id)),
            status: self
                .status
                .as_deref()
                .map(AppointmentStatus::from_wire)
                .unwrap_or(AppointmentStatus::Waiting),
            patient_name,
            slot_number: count_of(&self.slot_number),
            symptom: non_empty(self.symptom_initial),
        })
    }
}

/// One shift's capacity in `GET /doctor-shifts/availability`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShiftCapacity {
    #[serde(alias = "ShiftId")]
    pub shift_id: Option<WireInt>,
    #[serde(alias = "shiftName", alias = "Name")]
    pub name: Option<String>,
    #[serde(alias = "StartTime")]
    pub start_time: Option<String>,
    #[serde(alias = "EndTime")]
    pub end_time: Option<String>,
    #[serde(alias = "CurrentBookings")]
    pub current_bookings: Option<WireInt>,
    #[serde(alias = "MaxSlots")]
    pub max_slots: Option<WireInt>,
}

impl RawShiftCapacity {
    /// A missing `maxSlots` reads as zero, so the shift counts as full.
    pub fn normalize(self) -> Option<ShiftCapacity> {
        Some(ShiftCapacity {
            shift_id: id_of(&self.shift_id)?,
            name: non_empty(self.name).unwrap_or_default(),
            start_time: non_empty(self.start_time).unwrap_or_default(),
            end_time: non_empty(self.end_time).unwrap_or_default(),
            current_bookings: count_of(&self.current_bookings).unwrap_or(0),
            max_slots: count_of(&self.max_slots).unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDoctorAvailability {
    #[serde(alias = "DoctorId")]
    pub doctor_id: Option<WireInt>,
    #[serde(alias = "DoctorName", alias = "fullName")]
    pub doctor_name: Option<String>,
    #[serde(alias = "Shifts")]
    pub shifts: Option<Vec<Value>>,
}

impl RawDoctorAvailability {
    pub fn normalize(self) -> Option<DoctorAvailability> {
        let rows = self.shifts.unwrap_or_default();
        let shifts = decode_rows::<RawShiftCapacity>(rows, "shift capacity")
            .into_iter()
            .filter_map(RawShiftCapacity::normalize)
            .collect();
        Some(DoctorAvailability {
            doctor_id: id_of(&self.doctor_id)?,
            doctor_name: non_empty(self.doctor_name).unwrap_or_default(),
            shifts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn appointment(value: serde_json::Value) -> Appointment {
        serde_json::from_value::<RawAppointment>(value)
            .unwrap()
            .normalize()
            .unwrap()
    }

    #[test]
    fn legacy_and_lowercase_assignments_normalize_identically() {
        let modern: RawShiftAssignment = serde_json::from_value(json!({
            "id": 1, "doctorId": 9, "shiftId": 2, "workDate": "2024-05-06T00:00:00Z",
            "status": "ACTIVE",
            "shift": { "id": 2, "name": "Morning", "startTime": "08:00", "endTime": "12:00" }
        }))
        .unwrap();
        let legacy: RawShiftAssignment = serde_json::from_value(json!({
            "Id": "1", "DoctorId": "9", "ShiftId": 2, "WorkDate": "2024-05-06",
            "Status": "active",
            "Shift": { "Id": 2, "Name": "Morning", "StartTime": "08:00", "EndTime": "12:00" }
        }))
        .unwrap();

        assert_eq!(modern.normalize(), legacy.normalize());
    }

    #[test]
    fn assignment_without_shift_keeps_record() {
        let raw: RawShiftAssignment =
            serde_json::from_value(json!({ "id": 3, "workDate": "2024-05-06" })).unwrap();
        let assignment = raw.normalize().unwrap();
        assert!(assignment.shift.is_none());
        assert_eq!(assignment.status, AssignmentStatus::Active);
    }

    #[test]
    fn patient_name_precedence() {
        let both = appointment(json!({
            "id": 1, "date": "2024-05-06",
            "patientName": "  ",
            "patient": { "fullName": "Direct", "user": { "fullName": "Via User" } }
        }));
        assert_eq!(both.patient_name.as_deref(), Some("Via User"));

        let legacy = appointment(json!({
            "id": 2, "date": "2024-05-06",
            "Patient": { "User": { "FullName": "Legacy" } }
        }));
        assert_eq!(legacy.patient_name.as_deref(), Some("Legacy"));

        let mixed = appointment(json!({
            "id": 5, "date": "2024-05-06",
            "patient": { "fullName": "Direct" },
            "Patient": { "User": { "fullName": "Legacy" } }
        }));
        assert_eq!(mixed.patient_name.as_deref(), Some("Legacy"));

        let mixed_with_user = appointment(json!({
            "id": 6,
            "patient": { "user": { "fullName": "Via User" } },
            "Patient": { "User": { "fullName": "Legacy" } }
        }));
        assert_eq!(mixed_with_user.patient_name.as_deref(), Some("Via User"));

        let flat = appointment(json!({
            "id": 3, "date": "2024-05-06", "patientName": "Top", "patient": { "fullName": "Direct" }
        }));
        assert_eq!(flat.patient_name.as_deref(), Some("Top"));

        let direct = appointment(json!({ "id": 4, "patient": { "fullName": "Direct" } }));
        assert_eq!(direct.patient_name.as_deref(), Some("Direct"));
    }

    #[test]
    fn appointment_time_falls_back_to_shift_window() {
        let booked = appointment(json!({
            "id": 5, "date": "2024-05-06T09:00:00",
            "shift": { "id": 2, "name": "Morning", "startTime": "08:00:00", "endTime": "12:00:00" },
            "status": "checked_in", "slotNumber": 4
        }));
        assert_eq!(booked.date, "2024-05-06");
        assert_eq!(booked.time.as_deref(), Some("08:00 - 12:00"));
        assert_eq!(booked.shift_id, Some(2));
        assert_eq!(booked.status, AppointmentStatus::CheckedIn);
        assert_eq!(booked.slot_number, Some(4));
    }

    #[test]
    fn list_payload_accepts_bare_and_wrapped() {
        let bare: ListPayload<RawShiftTemplate> =
            serde_json::from_value(json!([{ "id": 1, "startTime": "08:00", "endTime": "12:00" }]))
                .unwrap();
        assert!(matches!(bare, ListPayload::Bare(ref v) if v.len() == 1));

        let wrapped: ListPayload<RawShiftTemplate> =
            serde_json::from_value(json!({ "success": true, "data": [] })).unwrap();
        assert!(matches!(wrapped, ListPayload::Wrapped(_)));
    }

    #[test]
    fn malformed_row_is_skipped_not_the_list() {
        let rows = vec![
            json!({ "id": 1, "slotNumber": 2 }),
            json!({ "id": 2, "slotNumber": "3" }),
            json!({ "id": 3, "slotNumber": [] }),
            json!({ "id": 4, "slotNumber": -1 }),
        ];
        let appointments: Vec<Appointment> = decode_rows::<RawAppointment>(rows, "appointment")
            .into_iter()
            .filter_map(RawAppointment::normalize)
            .collect();

        let slots: Vec<_> = appointments.iter().map(|a| (a.id, a.slot_number)).collect();
        assert_eq!(slots, vec![(1, Some(2)), (2, Some(3)), (4, None)]);
    }

    #[test]
    fn availability_tolerates_nulls_and_legacy_keys() {
        let rows = vec![
            json!({
                "doctorId": 9, "doctorName": null,
                "shifts": [
                    { "shiftId": 1, "name": "Sáng", "currentBookings": null, "maxSlots": "20" },
                    { "shiftId": "x" },
                    { "shiftId": 2, "currentBookings": { "bad": true } }
                ]
            }),
            json!({
                "DoctorId": "4", "DoctorName": "BS. Lan",
                "Shifts": [{ "ShiftId": 1, "Name": "Sáng", "CurrentBookings": 2, "MaxSlots": 2 }]
            }),
            json!("not a doctor"),
        ];
        let doctors: Vec<DoctorAvailability> =
            decode_rows::<RawDoctorAvailability>(rows, "doctor availability")
                .into_iter()
                .filter_map(RawDoctorAvailability::normalize)
                .collect();

        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[0].doctor_name, "");
        assert_eq!(doctors[0].shifts.len(), 1);
        assert_eq!(doctors[0].shifts[0].current_bookings, 0);
        assert_eq!(doctors[0].shifts[0].max_slots, 20);
        assert!(doctors[0].has_open_shift());

        assert_eq!(doctors[1].doctor_id, 4);
        assert_eq!(doctors[1].doctor_name, "BS. Lan");
        assert!(!doctors[1].has_open_shift());
    }
}
