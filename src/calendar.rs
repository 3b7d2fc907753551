//! Placement of schedule entries into shift-template slots.
//!
//! This module provides the slot matcher and the `WeekGrid` built on it:
//! one row per shift template, one cell per day of an ISO week.

use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{EntryKind, PersonalScheduleEntry, ShiftTemplate};

/// Date format shared with the backend.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Entries dated `date` that belong in `template`'s slot.
///
/// A shift entry carrying a shift id matches by id only. Everything else is
/// bucketed by whole-hour overlap with the template window.
pub fn entries_for_slot<'a>(
    date: &str,
    template: &ShiftTemplate,
    entries: &'a [PersonalScheduleEntry],
) -> Vec<&'a PersonalScheduleEntry> {
    entries
        .iter()
        .filter(|entry| entry.date == date)
        .filter(|entry| matches_template(entry, template, None))
        .collect()
}

/// `known_ids` limits exact-id matching to shift ids present in the loaded
/// templates; a shift entry pointing at an unknown template falls back to overlap.
fn matches_template(
    entry: &PersonalScheduleEntry,
    template: &ShiftTemplate,
    known_ids: Option<&HashSet<i64>>,
) -> bool {
    if entry.kind == EntryKind::Shift {
        if let Some(shift_id) = entry.shift_id {
            let known = known_ids.map_or(true, |ids| ids.contains(&shift_id));
            if known {
                return shift_id == template.id;
            }
        }
    }

    match (entry.hour_span(), template.hour_span()) {
        (Some(entry_span), Some(template_span)) => entry_span.overlaps_with(&template_span),
        _ => false,
    }
}

/// One template's row in the week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRow {
    pub template: ShiftTemplate,
    /// Seven cells, Monday first.
    pub cells: Vec<Vec<PersonalScheduleEntry>>,
}

/// A doctor's week laid out by shift template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGrid {
    pub days: [NaiveDate; 7],
    pub rows: Vec<WeekRow>,
}

impl WeekGrid {
    /// Monday of the ISO week containing `day`.
    pub fn week_start(day: NaiveDate) -> NaiveDate {
        day - Duration::days(day.weekday().num_days_from_monday() as i64)
    }

    /// Build the grid for the week containing `day`.
    pub fn build(
        day: NaiveDate,
        templates: &[ShiftTemplate],
        entries: &[PersonalScheduleEntry],
    ) -> Self {
        let monday = Self::week_start(day);
        let days: [NaiveDate; 7] = std::array::from_fn(|i| monday + Duration::days(i as i64));
        let known_ids: HashSet<i64> = templates.iter().map(|t| t.id).collect();

        let rows = templates
            .iter()
            .map(|template| {
                let cells = days
                    .iter()
                    .map(|day| {
                        let date = day.format(DATE_FORMAT).to_string();
                        let mut cell: Vec<PersonalScheduleEntry> = entries
                            .iter()
                            .filter(|entry| entry.date == date)
                            .filter(|entry| matches_template(entry, template, Some(&known_ids)))
                            .cloned()
                            .collect();
                        sort_cell(&mut cell);
                        cell
                    })
                    .collect();

                WeekRow {
                    template: template.clone(),
                    cells,
                }
            })
            .collect();

        WeekGrid { days, rows }
    }

    /// The cell for a template on a day, if both are in the grid.
    pub fn cell(&self, template_id: i64, day: NaiveDate) -> Option<&[PersonalScheduleEntry]> {
        let column = self.days.iter().position(|d| *d == day)?;
        let row = self.rows.iter().find(|r| r.template.id == template_id)?;
        row.cells.get(column).map(Vec::as_slice)
    }

    /// Number of placed entries. An entry overlapping two templates counts twice.
    pub fn placed_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .map(Vec::len)
            .sum()
    }
}

/// Shifts first, then appointments by queue number; unnumbered keep their order last.
fn sort_cell(cell: &mut [PersonalScheduleEntry]) {
    cell.sort_by_key(|entry| {
        (
            entry.kind != EntryKind::Shift,
            entry.slot_number.is_none(),
            entry.slot_number,
        )
    });
}

impl fmt::Display for WeekGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Week of {} - {}",
            self.days[0].format(DATE_FORMAT),
            self.days[6].format(DATE_FORMAT)
        )?;

        for (column, day) in self.days.iter().enumerate() {
            writeln!(f, "\n{}:", day.format("%A, %Y-%m-%d"))?;
            let mut empty = true;
            for row in &self.rows {
                let cell = &row.cells[column];
                if cell.is_empty() {
                    continue;
                }
                empty = false;
                writeln!(f, "  {} ({})", row.template.name, row.template.time_label())?;
                for entry in cell {
                    let marker = match entry.kind {
                        EntryKind::Shift => "shift",
                        EntryKind::Appointment => "appt ",
                    };
                    write!(f, "    [{}] {:20} {}", marker, entry.title, entry.status.name())?;
                    if let Some(slot) = entry.slot_number {
                        write!(f, "  #{}", slot)?;
                    }
                    writeln!(f)?;
                }
            }
            if empty {
                writeln!(f, "  (free)")?;
            }
        }
        Ok(())
    }
}
