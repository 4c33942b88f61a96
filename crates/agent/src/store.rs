use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use mission_core::activity::ActivityEntry;
use mission_core::errors::DomainError;
use mission_core::store::{CampaignState, ReduceOutcome, StoreAction};

/// Shared handle to the campaign state. Every write is one reducer action
/// applied under the write lock; concurrent writers are last-write-wins.
#[derive(Clone, Default)]
pub struct CampaignStore {
    state: Arc<RwLock<CampaignState>>,
}

impl CampaignStore {
    pub fn new(state: CampaignState) -> Self {
        Self { state: Arc::new(RwLock::new(state)) }
    }

    pub async fn dispatch(
        &self,
        action: StoreAction,
        correlation_id: &str,
    ) -> Result<ReduceOutcome, DomainError> {
        let mut state = self.state.write().await;
        let result = state.reduce(action, correlation_id);
        match &result {
            Ok(ReduceOutcome::Transitioned(outcome)) => info!(
                event_name = "strategy.transition_applied",
                correlation_id,
                from = outcome.from.as_str(),
                to = outcome.to.as_str(),
                event = ?outcome.event,
                "strategy mode changed"
            ),
            Ok(ReduceOutcome::StaleAttempt { attempt, current }) => info!(
                event_name = "strategy.stale_attempt_ignored",
                correlation_id,
                attempt,
                current,
                "ignored outcome from a superseded analysis attempt"
            ),
            Ok(ReduceOutcome::Updated) => {}
            Err(error) => warn!(
                event_name = "store.action_rejected",
                correlation_id,
                error = %error,
                "store rejected action"
            ),
        }
        result
    }

    pub async fn record(&self, entry: ActivityEntry) {
        let correlation_id = entry.correlation_id.clone();
        // Recording activity cannot fail.
        let _ = self.dispatch(StoreAction::ActivityRecorded(entry), &correlation_id).await;
    }

    pub async fn read<R>(&self, view: impl FnOnce(&CampaignState) -> R) -> R {
        let state = self.state.read().await;
        view(&state)
    }

    pub async fn snapshot(&self) -> CampaignState {
        self.state.read().await.clone()
    }
}
