//! Fixtures and an in-memory backend shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::api::ScheduleBackend;
use crate::cancellation::{ReschedulePreview, RescheduleSummary};
use crate::error::ApiError;
use crate::models::{
    Appointment, AppointmentStatus, AssignmentStatus, DoctorShiftAssignment, ShiftTemplate,
};

pub fn template(id: i64, name: &str, start: &str, end: &str) -> ShiftTemplate {
    ShiftTemplate::new(id, name, start, end).unwrap()
}

pub fn assignment(
    id: i64,
    shift_id: i64,
    date: &str,
    shift: Option<ShiftTemplate>,
) -> DoctorShiftAssignment {
    DoctorShiftAssignment {
        id,
        doctor_id: Some(1),
        shift_id: Some(shift_id),
        work_date: date.to_string(),
        status: AssignmentStatus::Active,
        shift,
    }
}

pub fn appointment(id: i64, date: &str, time: Option<&str>, patient: Option<&str>) -> Appointment {
    Appointment {
        id,
        doctor_id: Some(1),
        date: date.to_string(),
        time: time.map(str::to_string),
        shift_id: None,
        status: AppointmentStatus::Waiting,
        patient_name: patient.map(str::to_string),
        slot_number: None,
        symptom: None,
    }
}

#[derive(Default)]
pub struct FakeState {
    pub templates: Vec<ShiftTemplate>,
    pub assignments: Vec<DoctorShiftAssignment>,
    pub appointments: Vec<Appointment>,
    pub preview: ReschedulePreview,
    pub template_error: Option<ApiError>,
    pub appointment_error: Option<ApiError>,
    pub preview_error: Option<ApiError>,
    /// Consumed one per cancel call; an empty queue means success.
    pub cancel_errors: VecDeque<ApiError>,
    /// Scripted `doctor_shifts` answers, each with a delay. Falls back to
    /// `assignments` once empty.
    pub scripted_shifts: VecDeque<(Duration, Vec<DoctorShiftAssignment>)>,
    pub cancel_reasons: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new(state: FakeState) -> Self {
        FakeBackend {
            state: Mutex::new(state),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl ScheduleBackend for FakeBackend {
    async fn shift_templates(&self) -> Result<Vec<ShiftTemplate>, ApiError> {
        self.with(|s| match &s.template_error {
            Some(error) => Err(error.clone()),
            None => Ok(s.templates.clone()),
        })
    }

    async fn doctor_shifts(&self, doctor_id: i64) -> Result<Vec<DoctorShiftAssignment>, ApiError> {
        let scripted = self.with(|s| s.scripted_shifts.pop_front());
        if let Some((delay, assignments)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(assignments);
        }
        Ok(self.with(|s| {
            s.assignments
                .iter()
                .filter(|a| a.doctor_id == Some(doctor_id))
                .cloned()
                .collect()
        }))
    }

    async fn appointments(
        &self,
        doctor_id: i64,
        date: Option<&str>,
    ) -> Result<Vec<Appointment>, ApiError> {
        self.with(|s| match &s.appointment_error {
            Some(error) => Err(error.clone()),
            None => Ok(s
                .appointments
                .iter()
                .filter(|a| a.doctor_id == Some(doctor_id))
                .filter(|a| date.map_or(true, |d| a.date == d))
                .cloned()
                .collect()),
        })
    }

    async fn reschedule_preview(&self, _assignment_id: i64) -> Result<ReschedulePreview, ApiError> {
        self.with(|s| match &s.preview_error {
            Some(error) => Err(error.clone()),
            None => Ok(s.preview.clone()),
        })
    }

    async fn cancel_and_reschedule(
        &self,
        assignment_id: i64,
        reason: &str,
    ) -> Result<RescheduleSummary, ApiError> {
        self.with(|s| {
            s.cancel_reasons.push(reason.to_string());
            if let Some(error) = s.cancel_errors.pop_front() {
                return Err(error);
            }
            for assignment in s.assignments.iter_mut().filter(|a| a.id == assignment_id) {
                assignment.status = AssignmentStatus::Cancelled;
            }
            let total = s.preview.affected_appointments;
            let rescheduled = if s.preview.has_replacement_doctor { total } else { 0 };
            Ok(RescheduleSummary {
                total_appointments: total,
                rescheduled_count: rescheduled,
                failed_count: total - rescheduled,
            })
        })
    }
}
