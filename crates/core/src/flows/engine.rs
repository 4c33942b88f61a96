use thiserror::Error;

use crate::activity::{ActivityCategory, ActivityEntry, ActivityOutcome, ActivitySink};
use crate::flows::states::{StrategyAction, StrategyEvent, StrategyMode, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid strategy transition from {state:?} using event {event:?}")]
    InvalidTransition { state: StrategyMode, event: StrategyEvent },
}

#[derive(Clone, Debug, Default)]
pub struct StrategyFlow;

impl StrategyFlow {
    pub fn initial_state(&self) -> StrategyMode {
        StrategyMode::Idle
    }

    pub fn apply(
        &self,
        current: StrategyMode,
        event: &StrategyEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event)
    }

    pub fn apply_with_activity<S>(
        &self,
        current: StrategyMode,
        event: &StrategyEvent,
        sink: &mut S,
        correlation_id: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: ActivitySink,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => sink.record(
                ActivityEntry::new(
                    correlation_id,
                    "strategy.transition_applied",
                    ActivityCategory::Strategy,
                    ActivityOutcome::Success,
                    format!("{} -> {}", outcome.from.as_str(), outcome.to.as_str()),
                )
                .with_metadata("event", format!("{:?}", outcome.event)),
            ),
            Err(error) => sink.record(
                ActivityEntry::new(
                    correlation_id,
                    "strategy.transition_rejected",
                    ActivityCategory::Strategy,
                    ActivityOutcome::Rejected,
                    error.to_string(),
                )
                .with_metadata("from", current.as_str()),
            ),
        }
        result
    }
}

fn transition(
    current: StrategyMode,
    event: &StrategyEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use StrategyAction::{
        ApplySuggestedConfig, ClearDerivedState, ClearFileInput, ClearPersistence,
        PersistActiveAnalysis, StartTimeoutGuard, StoreActiveAnalysis, SurfaceError,
    };
    use StrategyEvent::{
        AnalysisFailed, AnalysisRestored, AnalysisSucceeded, AnalysisTimedOut, CancelRequested,
        FileAccepted, RequestDispatched, ResetRequested, RetryRequested,
    };
    use StrategyMode::{Analyzing, Complete, Error, Idle, Uploading};

    let (to, actions) = match (current, event) {
        (Idle, FileAccepted) => (Uploading, Vec::new()),
        (Uploading, RequestDispatched) => (Analyzing, vec![StartTimeoutGuard]),
        (Analyzing, AnalysisSucceeded) => (
            Complete,
            vec![StoreActiveAnalysis, ApplySuggestedConfig, PersistActiveAnalysis],
        ),
        (Uploading, AnalysisFailed) | (Analyzing, AnalysisFailed) => (Error, vec![SurfaceError]),
        (Analyzing, AnalysisTimedOut) => (Error, vec![SurfaceError]),
        (Error, RetryRequested) => (Idle, vec![ClearFileInput]),
        (Error, CancelRequested) | (Uploading, CancelRequested) | (Analyzing, CancelRequested) => {
            (Idle, vec![ClearFileInput])
        }
        (_, ResetRequested) => (Idle, vec![ClearFileInput, ClearDerivedState, ClearPersistence]),
        (Idle, AnalysisRestored) => (Complete, vec![StoreActiveAnalysis]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::activity::ActivityLog;
    use crate::flows::engine::{FlowTransitionError, StrategyFlow};
    use crate::flows::states::{StrategyAction, StrategyEvent, StrategyMode};

    #[test]
    fn happy_path_reaches_complete() {
        let flow = StrategyFlow;
        let mut state = flow.initial_state();

        for event in [
            StrategyEvent::FileAccepted,
            StrategyEvent::RequestDispatched,
            StrategyEvent::AnalysisSucceeded,
        ] {
            state = flow.apply(state, &event).expect("happy path transition").to;
        }

        assert_eq!(state, StrategyMode::Complete);
    }

    #[test]
    fn dispatch_starts_timeout_guard() {
        let outcome = StrategyFlow
            .apply(StrategyMode::Uploading, &StrategyEvent::RequestDispatched)
            .expect("uploading -> analyzing");

        assert_eq!(outcome.to, StrategyMode::Analyzing);
        assert_eq!(outcome.actions, vec![StrategyAction::StartTimeoutGuard]);
    }

    #[test]
    fn timeout_is_applied_exactly_once() {
        let flow = StrategyFlow;
        let errored = flow
            .apply(StrategyMode::Analyzing, &StrategyEvent::AnalysisTimedOut)
            .expect("analyzing -> error");
        assert_eq!(errored.to, StrategyMode::Error);

        let second = flow.apply(errored.to, &StrategyEvent::AnalysisTimedOut);
        assert!(matches!(second, Err(FlowTransitionError::InvalidTransition { .. })));
    }

    #[test]
    fn late_success_after_timeout_is_rejected() {
        let error = StrategyFlow
            .apply(StrategyMode::Error, &StrategyEvent::AnalysisSucceeded)
            .expect_err("late success must not resurrect complete");

        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: StrategyMode::Error,
                event: StrategyEvent::AnalysisSucceeded
            }
        );
    }

    #[test]
    fn retry_and_cancel_return_to_idle_from_error() {
        let flow = StrategyFlow;
        for event in [StrategyEvent::RetryRequested, StrategyEvent::CancelRequested] {
            let outcome = flow.apply(StrategyMode::Error, &event).expect("error -> idle");
            assert_eq!(outcome.to, StrategyMode::Idle);
            assert!(outcome.actions.contains(&StrategyAction::ClearFileInput));
        }
    }

    #[test]
    fn reset_is_accepted_from_every_state() {
        let flow = StrategyFlow;
        for state in [
            StrategyMode::Idle,
            StrategyMode::Uploading,
            StrategyMode::Analyzing,
            StrategyMode::Complete,
            StrategyMode::Error,
        ] {
            let outcome = flow.apply(state, &StrategyEvent::ResetRequested).expect("reset");
            assert_eq!(outcome.to, StrategyMode::Idle);
            assert!(outcome.actions.contains(&StrategyAction::ClearPersistence));
        }
    }

    #[test]
    fn submit_is_rejected_while_busy() {
        let result = StrategyFlow.apply(StrategyMode::Analyzing, &StrategyEvent::FileAccepted);
        assert!(result.is_err());
    }

    #[test]
    fn transitions_are_recorded_in_activity_log() {
        let mut log = ActivityLog::default();
        let flow = StrategyFlow;

        flow.apply_with_activity(
            StrategyMode::Idle,
            &StrategyEvent::FileAccepted,
            &mut log,
            "req-1",
        )
        .expect("idle -> uploading");
        let _ = flow.apply_with_activity(
            StrategyMode::Idle,
            &StrategyEvent::AnalysisSucceeded,
            &mut log,
            "req-2",
        );

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, "strategy.transition_applied");
        assert_eq!(entries[0].message, "IDLE -> UPLOADING");
        assert_eq!(entries[1].event_type, "strategy.transition_rejected");
        assert_eq!(entries[1].correlation_id, "req-2");
    }
}
