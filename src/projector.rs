//! Projection of shift assignments and appointments into one flat schedule.

use crate::models::{
    Appointment, DoctorShiftAssignment, EntryKind, EntryStatus, PersonalScheduleEntry,
};

/// Merge assignments and appointments into schedule entries.
///
/// Shifts come first, then appointments, each in input order. Assignments
/// without a nested shift are dropped. The function is pure.
pub fn project(
    assignments: &[DoctorShiftAssignment],
    appointments: &[Appointment],
) -> Vec<PersonalScheduleEntry> {
    assignments
        .iter()
        .filter_map(shift_entry)
        .chain(appointments.iter().map(appointment_entry))
        .collect()
}

fn shift_entry(assignment: &DoctorShiftAssignment) -> Option<PersonalScheduleEntry> {
    let shift = assignment.shift.as_ref()?;
    let time = shift.time_label();

    Some(PersonalScheduleEntry {
        id: format!("shift-{}", assignment.id),
        date: assignment.work_date.clone(),
        description: format!("Shift {} ({})", shift.name, time),
        time,
        kind: EntryKind::Shift,
        title: shift.name.clone(),
        status: EntryStatus::from(assignment.status),
        patient_name: None,
        shift_id: assignment.shift_id.or(Some(shift.id)),
        slot_number: None,
    })
}

fn appointment_entry(appointment: &Appointment) -> PersonalScheduleEntry {
    let title = appointment
        .patient_name
        .clone()
        .unwrap_or_else(|| "Appointment".to_string());
    let description = match (&appointment.symptom, appointment.slot_number) {
        (Some(symptom), _) => symptom.clone(),
        (None, Some(slot)) => format!("Queue number {slot}"),
        (None, None) => String::new(),
    };

    PersonalScheduleEntry {
        id: format!("appointment-{}", appointment.id),
        date: appointment.date.clone(),
        time: appointment.time.clone().unwrap_or_default(),
        kind: EntryKind::Appointment,
        title,
        description,
        status: EntryStatus::from(appointment.status),
        patient_name: appointment.patient_name.clone(),
        shift_id: appointment.shift_id,
        slot_number: appointment.slot_number,
    }
}
