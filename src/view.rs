//! Personal schedule view state, refresh and auto-refresh.
//!
//! The three fetches behind a refresh are independent: a failing section is
//! reported and rendered empty while the others still populate. Each refresh
//! takes a generation number and is applied only if nothing newer has been
//! applied, so a slow response can never overwrite fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::ScheduleBackend;
use crate::calendar::WeekGrid;
use crate::error::ApiError;
use crate::models::{PersonalScheduleEntry, ShiftTemplate};
use crate::projector::project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ShiftTemplates,
    Shifts,
    Appointments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFailure {
    pub section: Section,
    pub error: ApiError,
}

/// Outcome of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub generation: u64,
    /// False when a newer refresh had already been applied.
    pub applied: bool,
    pub failures: Vec<SectionFailure>,
}

/// What the page renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    /// Generation that produced this state; 0 before the first load.
    pub generation: u64,
    pub templates: Vec<ShiftTemplate>,
    pub entries: Vec<PersonalScheduleEntry>,
}

/// A doctor's personal schedule page.
pub struct ScheduleView {
    doctor_id: i64,
    next_generation: AtomicU64,
    state: Mutex<ScheduleSnapshot>,
}

impl ScheduleView {
    pub fn new(doctor_id: i64) -> Self {
        ScheduleView {
            doctor_id,
            next_generation: AtomicU64::new(0),
            state: Mutex::new(ScheduleSnapshot::default()),
        }
    }

    pub fn doctor_id(&self) -> i64 {
        self.doctor_id
    }

    /// Reserve the generation number for a new refresh.
    pub fn begin_refresh(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install fetched data unless a newer generation is already applied.
    pub fn apply(
        &self,
        generation: u64,
        templates: Vec<ShiftTemplate>,
        entries: Vec<PersonalScheduleEntry>,
    ) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if generation <= state.generation {
            debug!(
                generation,
                current = state.generation,
                "Discarding stale schedule response"
            );
            return false;
        }
        *state = ScheduleSnapshot {
            generation,
            templates,
            entries,
        };
        true
    }

    /// Fetch everything for this doctor and apply it.
    pub async fn refresh<B: ScheduleBackend>(&self, backend: &B) -> RefreshReport {
        let generation = self.begin_refresh();
        debug!(doctor_id = self.doctor_id, generation, "Refreshing schedule");

        let (templates, shifts, appointments) = tokio::join!(
            backend.shift_templates(),
            backend.doctor_shifts(self.doctor_id),
            backend.appointments(self.doctor_id, None),
        );

        let mut failures = Vec::new();
        let templates = or_empty(templates, Section::ShiftTemplates, &mut failures);
        let shifts = or_empty(shifts, Section::Shifts, &mut failures);
        let appointments = or_empty(appointments, Section::Appointments, &mut failures);

        let entries = project(&shifts, &appointments);
        let applied = self.apply(generation, templates, entries);
        if applied {
            info!(
                doctor_id = self.doctor_id,
                generation,
                failed_sections = failures.len(),
                "Schedule refreshed"
            );
        }

        RefreshReport {
            generation,
            applied,
            failures,
        }
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entry(&self, id: &str) -> Option<PersonalScheduleEntry> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// The weekly grid for the week containing `day`.
    pub fn week(&self, day: NaiveDate) -> WeekGrid {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        WeekGrid::build(day, &state.templates, &state.entries)
    }
}

fn or_empty<T>(
    result: Result<Vec<T>, ApiError>,
    section: Section,
    failures: &mut Vec<SectionFailure>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(error) => {
            warn!(?section, %error, "Schedule section failed to load");
            failures.push(SectionFailure { section, error });
            Vec::new()
        }
    }
}

/// Periodic refresh bound to a handle's lifetime.
///
/// The first refresh runs immediately. Dropping the handle aborts the task;
/// `stop` lets an in-flight refresh finish first.
pub struct AutoRefresh {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    pub fn spawn<B, F>(
        view: Arc<ScheduleView>,
        backend: Arc<B>,
        every: Duration,
        mut on_refresh: F,
    ) -> Self
    where
        B: ScheduleBackend + 'static,
        F: FnMut(&ScheduleView, RefreshReport) + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let report = view.refresh(backend.as_ref()).await;
                        on_refresh(view.as_ref(), report);
                    }
                }
            }
            debug!(doctor_id = view.doctor_id(), "Auto-refresh stopped");
        });

        AutoRefresh {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentStatus;
    use crate::testing::{appointment, assignment, template, FakeBackend, FakeState};
    use std::sync::atomic::AtomicUsize;

    fn populated_backend() -> FakeBackend {
        let morning = template(1, "Morning", "08:00", "12:00");
        FakeBackend::new(FakeState {
            templates: vec![morning.clone()],
            assignments: vec![assignment(7, 1, "2024-05-06", Some(morning))],
            appointments: vec![appointment(20, "2024-05-06", Some("09:00"), Some("An"))],
            ..FakeState::default()
        })
    }

    #[tokio::test]
    async fn refresh_populates_view() {
        let backend = populated_backend();
        let view = ScheduleView::new(1);

        let report = view.refresh(&backend).await;

        assert!(report.applied);
        assert!(report.failures.is_empty());
        let snapshot = view.snapshot();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.templates.len(), 1);
        assert_eq!(snapshot.entries.len(), 2);

        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(view.week(day).cell(1, day).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_section_degrades_to_empty() {
        let backend = populated_backend();
        backend.with(|s| s.appointment_error = Some(ApiError::Server { status: 500, message: "boom".into() }));
        let view = ScheduleView::new(1);

        let report = view.refresh(&backend).await;

        assert!(report.applied);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].section, Section::Appointments);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.templates.len(), 1);
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].id, "shift-7");
    }

    #[test]
    fn older_generation_is_discarded() {
        let view = ScheduleView::new(1);
        let first = view.begin_refresh();
        let second = view.begin_refresh();

        assert!(view.apply(second, vec![template(2, "Newer", "13:00", "17:00")], vec![]));
        assert!(!view.apply(first, vec![template(1, "Older", "08:00", "12:00")], vec![]));
        assert_eq!(view.snapshot().templates[0].name, "Newer");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_refresh_does_not_overwrite() {
        let morning = template(1, "Morning", "08:00", "12:00");
        let mut old = assignment(7, 1, "2024-05-06", Some(morning.clone()));
        old.status = AssignmentStatus::Active;
        let mut new = old.clone();
        new.status = AssignmentStatus::Cancelled;

        let backend = populated_backend();
        backend.with(|s| {
            s.scripted_shifts.push_back((Duration::from_secs(5), vec![old]));
            s.scripted_shifts.push_back((Duration::from_millis(10), vec![new]));
        });
        let view = ScheduleView::new(1);

        let (slow, fast) = tokio::join!(view.refresh(&backend), view.refresh(&backend));

        assert!(fast.applied);
        assert!(!slow.applied);
        assert_eq!(
            view.entry("shift-7").unwrap().status,
            crate::models::EntryStatus::Cancelled
        );
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_ticks_until_stopped() {
        let view = Arc::new(ScheduleView::new(1));
        let backend = Arc::new(populated_backend());
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let handle = AutoRefresh::spawn(view.clone(), backend, Duration::from_secs(30), move |_, report| {
            assert!(report.applied);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(65)).await;
        handle.stop().await;
        let seen = ticks.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        assert_eq!(view.snapshot().generation, 3);
    }
}
