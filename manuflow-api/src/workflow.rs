//! Step-by-step execution rules shared by rondas and ad-hoc inspections.
//!
//! A run starts PENDING, becomes IN_PROGRESS when started or when any step
//! is saved, and can only be COMPLETED once every step is COMPLETED. A
//! completed run is frozen.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::error::ApiError;
use crate::models::{InspectionStep, ScheduledInspectionStep, WorkStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("This run is already completed")]
    AlreadyCompleted,
    #[error("{0} step(s) are not completed yet")]
    IncompleteSteps(usize),
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        ApiError::Conflict(e.to_string())
    }
}

/// Failure while saving a step or changing the state of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Step not found")]
    StepNotFound,
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::Workflow(w) => w.into(),
            RunError::StepNotFound => ApiError::not_found("Step not found"),
            RunError::Database(d) => d.into(),
        }
    }
}

/// Anything with a step status.
pub trait HasWorkStatus {
    fn work_status(&self) -> WorkStatus;
}

impl HasWorkStatus for ScheduledInspectionStep {
    fn work_status(&self) -> WorkStatus {
        self.status
    }
}

impl HasWorkStatus for InspectionStep {
    fn work_status(&self) -> WorkStatus {
        self.status
    }
}

/// Index of the first step that is not completed; `None` when all are.
/// Steps must already be in execution order.
pub fn current_step_index<S: HasWorkStatus>(steps: &[S]) -> Option<usize> {
    steps
        .iter()
        .position(|s| s.work_status() != WorkStatus::Completed)
}

/// Status of the run after a `start` request.
pub fn start(run: WorkStatus) -> Result<WorkStatus, WorkflowError> {
    match run {
        WorkStatus::Completed => Err(WorkflowError::AlreadyCompleted),
        WorkStatus::Pending | WorkStatus::InProgress => Ok(WorkStatus::InProgress),
    }
}

/// Status of the run after one of its steps is saved.
pub fn after_step_update(run: WorkStatus) -> Result<WorkStatus, WorkflowError> {
    start(run)
}

/// Checks that the run may be completed.
pub fn complete<S: HasWorkStatus>(run: WorkStatus, steps: &[S]) -> Result<WorkStatus, WorkflowError> {
    if run == WorkStatus::Completed {
        return Err(WorkflowError::AlreadyCompleted);
    }
    let open = steps
        .iter()
        .filter(|s| s.work_status() != WorkStatus::Completed)
        .count();
    if open > 0 {
        return Err(WorkflowError::IncompleteSteps(open));
    }
    Ok(WorkStatus::Completed)
}

/// `completed_at` of a step after it moves from `old` to `new`. Completing
/// keeps an earlier stamp, reopening clears it.
pub fn step_completed_at(
    old: WorkStatus,
    old_completed_at: Option<NaiveDateTime>,
    new: WorkStatus,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    match (old, new) {
        (WorkStatus::Completed, WorkStatus::Completed) => old_completed_at.or(Some(now)),
        (_, WorkStatus::Completed) => Some(now),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Step(WorkStatus);

    impl HasWorkStatus for Step {
        fn work_status(&self) -> WorkStatus {
            self.0
        }
    }

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_current_step_index() {
        use WorkStatus::*;
        assert_eq!(current_step_index(&[Step(Completed), Step(Pending), Step(Pending)]), Some(1));
        assert_eq!(current_step_index(&[Step(Completed), Step(InProgress)]), Some(1));
        assert_eq!(current_step_index(&[Step(Completed), Step(Completed)]), None);
        assert_eq!(current_step_index::<Step>(&[]), None);
    }

    #[test]
    fn test_start_and_step_update_transitions() {
        assert_eq!(start(WorkStatus::Pending), Ok(WorkStatus::InProgress));
        assert_eq!(start(WorkStatus::InProgress), Ok(WorkStatus::InProgress));
        assert_eq!(start(WorkStatus::Completed), Err(WorkflowError::AlreadyCompleted));
        assert_eq!(after_step_update(WorkStatus::Pending), Ok(WorkStatus::InProgress));
        assert_eq!(
            after_step_update(WorkStatus::Completed),
            Err(WorkflowError::AlreadyCompleted)
        );
    }

    #[test]
    fn test_complete_requires_all_steps() {
        use WorkStatus::*;
        assert_eq!(
            complete(InProgress, &[Step(Completed), Step(Pending)]),
            Err(WorkflowError::IncompleteSteps(1))
        );
        assert_eq!(complete(InProgress, &[Step(Completed)]), Ok(Completed));
        assert_eq!(complete(Pending, &[Step(Completed)]), Ok(Completed));
        assert_eq!(complete(Completed, &[Step(Completed)]), Err(WorkflowError::AlreadyCompleted));
    }

    #[test]
    fn test_step_completed_at() {
        use WorkStatus::*;
        assert_eq!(step_completed_at(Pending, None, Completed, at(9)), Some(at(9)));
        assert_eq!(step_completed_at(Completed, Some(at(8)), Completed, at(9)), Some(at(8)));
        assert_eq!(step_completed_at(Completed, Some(at(8)), InProgress, at(9)), None);
        assert_eq!(step_completed_at(Pending, None, InProgress, at(9)), None);
    }
}
