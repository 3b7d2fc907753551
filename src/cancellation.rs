//! Cancel-and-reschedule flow for a doctor's shift.
//!
//! The dialog walks `Idle -> PreviewRequested -> PreviewLoaded -> Confirming
//! -> Submitting -> Done | Failed`. A failed submission keeps the preview and
//! reason so the user can retry; nothing retries on its own. After a
//! successful submission the schedule is re-fetched from the backend rather
//! than patched locally.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::ScheduleBackend;
use crate::error::ApiError;
use crate::view::{RefreshReport, ScheduleView};

/// What cancelling a shift would do, as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReschedulePreview {
    pub affected_appointments: u32,
    pub has_replacement_doctor: bool,
    pub can_auto_reschedule: bool,
    pub warning: Option<String>,
}

/// Result of a cancel-and-reschedule call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RescheduleSummary {
    pub total_appointments: u32,
    pub rescheduled_count: u32,
    pub failed_count: u32,
}

impl RescheduleSummary {
    /// Calculate the rescheduled share as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total_appointments == 0 {
            return 0.0;
        }
        (self.rescheduled_count as f64 / self.total_appointments as f64) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationState {
    Idle,
    PreviewRequested,
    PreviewLoaded(ReschedulePreview),
    Confirming {
        preview: ReschedulePreview,
        reason: String,
    },
    Submitting {
        preview: ReschedulePreview,
        reason: String,
    },
    Done(RescheduleSummary),
    Failed {
        preview: ReschedulePreview,
        reason: String,
        error: ApiError,
    },
}

impl CancellationState {
    pub fn name(&self) -> &'static str {
        match self {
            CancellationState::Idle => "idle",
            CancellationState::PreviewRequested => "preview requested",
            CancellationState::PreviewLoaded(_) => "preview loaded",
            CancellationState::Confirming { .. } => "confirming",
            CancellationState::Submitting { .. } => "submitting",
            CancellationState::Done(_) => "done",
            CancellationState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("A cancellation reason is required")]
    EmptyReason,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// State machine behind the "cancel shift" dialog.
#[derive(Debug)]
pub struct CancellationFlow {
    assignment_id: i64,
    state: CancellationState,
}

impl CancellationFlow {
    pub fn new(assignment_id: i64) -> Self {
        CancellationFlow {
            assignment_id,
            state: CancellationState::Idle,
        }
    }

    pub fn assignment_id(&self) -> i64 {
        self.assignment_id
    }

    pub fn state(&self) -> &CancellationState {
        &self.state
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// Fetch the preview. On failure the dialog returns to `Idle`.
    pub async fn load_preview<B: ScheduleBackend>(
        &mut self,
        backend: &B,
    ) -> Result<ReschedulePreview, FlowError> {
        if self.state != CancellationState::Idle {
            return Err(self.invalid("load preview"));
        }

        self.state = CancellationState::PreviewRequested;
        match backend.reschedule_preview(self.assignment_id).await {
            Ok(preview) => {
                self.state = CancellationState::PreviewLoaded(preview.clone());
                Ok(preview)
            }
            Err(error) => {
                warn!(assignment_id = self.assignment_id, %error, "Reschedule preview failed");
                self.state = CancellationState::Idle;
                Err(error.into())
            }
        }
    }

    /// Record the reason. Allowed after the preview, while confirming, and
    /// after a failed submission.
    pub fn confirm(&mut self, reason: &str) -> Result<(), FlowError> {
        let reason = reason.trim();
        let preview = match &self.state {
            CancellationState::PreviewLoaded(preview)
            | CancellationState::Confirming { preview, .. }
            | CancellationState::Failed { preview, .. } => preview.clone(),
            _ => return Err(self.invalid("confirm")),
        };
        if reason.is_empty() {
            return Err(FlowError::EmptyReason);
        }

        self.state = CancellationState::Confirming {
            preview,
            reason: reason.to_string(),
        };
        Ok(())
    }

    /// Post the cancellation. Allowed from `Confirming`, or from `Failed` to retry.
    pub async fn submit<B: ScheduleBackend>(
        &mut self,
        backend: &B,
    ) -> Result<RescheduleSummary, FlowError> {
        let (preview, reason) = match &self.state {
            CancellationState::Confirming { preview, reason }
            | CancellationState::Failed { preview, reason, .. } => (preview.clone(), reason.clone()),
            _ => return Err(self.invalid("submit")),
        };

        self.state = CancellationState::Submitting {
            preview: preview.clone(),
            reason: reason.clone(),
        };

        match backend.cancel_and_reschedule(self.assignment_id, &reason).await {
            Ok(summary) => {
                info!(
                    assignment_id = self.assignment_id,
                    rescheduled = summary.rescheduled_count,
                    "Shift cancellation submitted"
                );
                self.state = CancellationState::Done(summary.clone());
                Ok(summary)
            }
            Err(error) => {
                warn!(assignment_id = self.assignment_id, %error, "Shift cancellation failed");
                self.state = CancellationState::Failed {
                    preview,
                    reason,
                    error: error.clone(),
                };
                Err(error.into())
            }
        }
    }

    /// Close the dialog.
    pub fn reset(&mut self) {
        self.state = CancellationState::Idle;
    }
}

/// Submit the flow, then re-fetch the whole view on success.
pub async fn submit_and_refresh<B: ScheduleBackend>(
    flow: &mut CancellationFlow,
    view: &ScheduleView,
    backend: &B,
) -> Result<(RescheduleSummary, RefreshReport), FlowError> {
    let summary = flow.submit(backend).await?;
    let report = view.refresh(backend).await;
    Ok((summary, report))
}
