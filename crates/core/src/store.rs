//! Campaign state container.
//!
//! All dashboard state lives in one [`CampaignState`] value and is only
//! changed through [`CampaignState::reduce`]. Mode changes go through the
//! [`StrategyFlow`] so an out-of-order gateway outcome cannot move the
//! strategy mode somewhere the flow does not allow.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::activity::{ActivityCategory, ActivityEntry, ActivityLog, ActivityOutcome, ActivitySink};
use crate::domain::analysis::{AnalysisResult, SectorInsight};
use crate::domain::call::{Call, CallUpdate};
use crate::domain::campaign::{CampaignConfig, SuggestedConfig};
use crate::domain::email::{EmailDraft, EmailDraftId, EmailStatus};
use crate::domain::lead::{Lead, LeadId, LeadScore, LeadStatus};
use crate::domain::strategy::{ActiveTab, Strategy};
use crate::errors::DomainError;
use crate::flows::{StrategyAction, StrategyEvent, StrategyFlow, StrategyMode, TransitionOutcome};

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignState {
    pub strategy_mode: StrategyMode,
    pub strategy: Option<Strategy>,
    pub active_analysis: Option<AnalysisResult>,
    /// Most recent first.
    pub analysis_history: Vec<AnalysisResult>,
    pub leads: Vec<Lead>,
    /// Scores survive lead replacement, so entries may refer to leads that
    /// are no longer listed.
    pub lead_scores: BTreeMap<LeadId, LeadScore>,
    pub email_queue: Vec<EmailDraft>,
    pub active_call: Option<Call>,
    pub call_history: Vec<Call>,
    pub campaign_config: CampaignConfig,
    pub activity_log: ActivityLog,
    pub active_tab: ActiveTab,
    pub last_error: Option<String>,
    pub current_file: Option<String>,
    pub analysis_attempt: u64,
    pub campaign_running: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreAction {
    UploadStarted { file_name: String },
    AnalysisDispatched { attempt: u64 },
    AnalysisSucceeded { attempt: u64, result: AnalysisResult, suggested: Option<SuggestedConfig> },
    AnalysisFailed { attempt: u64, message: String },
    AnalysisTimedOut { attempt: u64, seconds: u64 },
    RetryRequested,
    CancelRequested,
    ResetRequested,
    AnalysisRestored(AnalysisResult),
    SectorApproved(SectorInsight),
    TabSelected(ActiveTab),
    LeadsReplaced(Vec<Lead>),
    ScoreRecorded { lead_id: LeadId, score: LeadScore },
    DraftQueued(EmailDraft),
    /// Queues the next sequence step only while `after` is still queued.
    FollowUpQueued { after: EmailDraftId, draft: EmailDraft },
    DraftStatusChanged { draft_id: EmailDraftId, status: EmailStatus },
    CampaignRunning(bool),
    CallStarted(Call),
    CallUpdated(CallUpdate),
    ConfigUpdated(CampaignConfig),
    ActivityRecorded(ActivityEntry),
}

/// What a reduction did to the state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReduceOutcome {
    Updated,
    Transitioned(TransitionOutcome),
    /// The action belonged to an analysis attempt that is no longer current.
    StaleAttempt { attempt: u64, current: u64 },
}

impl ReduceOutcome {
    pub fn transition(&self) -> Option<&TransitionOutcome> {
        match self {
            Self::Transitioned(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn requires(&self, action: &StrategyAction) -> bool {
        self.transition().map(|outcome| outcome.actions.contains(action)).unwrap_or(false)
    }
}

impl CampaignState {
    pub fn reduce(
        &mut self,
        action: StoreAction,
        correlation_id: &str,
    ) -> Result<ReduceOutcome, DomainError> {
        match action {
            StoreAction::UploadStarted { file_name } => {
                let outcome = self.transition(StrategyEvent::FileAccepted, correlation_id)?;
                self.analysis_attempt += 1;
                self.current_file = Some(file_name);
                self.last_error = None;
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::AnalysisDispatched { attempt } => {
                if let Some(stale) = self.stale(attempt) {
                    return Ok(stale);
                }
                let outcome = self.transition(StrategyEvent::RequestDispatched, correlation_id)?;
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::AnalysisSucceeded { attempt, result, suggested } => {
                if let Some(stale) = self.stale(attempt) {
                    return Ok(stale);
                }
                let outcome = self.transition(StrategyEvent::AnalysisSucceeded, correlation_id)?;
                for step in &outcome.actions {
                    match step {
                        StrategyAction::StoreActiveAnalysis => {
                            self.analysis_history.insert(0, result.clone());
                            self.active_analysis = Some(result.clone());
                        }
                        StrategyAction::ApplySuggestedConfig => {
                            if let Some(suggested) = &suggested {
                                self.campaign_config.apply_suggestion(suggested);
                            }
                        }
                        _ => {}
                    }
                }
                self.last_error = None;
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::AnalysisFailed { attempt, message } => {
                if let Some(stale) = self.stale(attempt) {
                    return Ok(stale);
                }
                let outcome = self.transition(StrategyEvent::AnalysisFailed, correlation_id)?;
                self.last_error = Some(message);
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::AnalysisTimedOut { attempt, seconds } => {
                if let Some(stale) = self.stale(attempt) {
                    return Ok(stale);
                }
                let outcome = self.transition(StrategyEvent::AnalysisTimedOut, correlation_id)?;
                self.last_error = Some(format!(
                    "Analysis did not finish within {seconds} seconds. \
                     Try again or upload a smaller document."
                ));
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::RetryRequested => {
                let outcome = self.transition(StrategyEvent::RetryRequested, correlation_id)?;
                self.clear_file_input();
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::CancelRequested => {
                let outcome = self.transition(StrategyEvent::CancelRequested, correlation_id)?;
                self.clear_file_input();
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::ResetRequested => {
                let outcome = self.transition(StrategyEvent::ResetRequested, correlation_id)?;
                if outcome.actions.contains(&StrategyAction::ClearFileInput) {
                    self.clear_file_input();
                }
                if outcome.actions.contains(&StrategyAction::ClearDerivedState) {
                    self.clear_derived_state();
                }
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::AnalysisRestored(result) => {
                let outcome = self.transition(StrategyEvent::AnalysisRestored, correlation_id)?;
                self.active_analysis = Some(result);
                Ok(ReduceOutcome::Transitioned(outcome))
            }
            StoreAction::SectorApproved(sector) => {
                self.strategy = Some(Strategy::from_sector(&sector));
                self.active_tab = ActiveTab::LeadGen;
                self.note(
                    correlation_id,
                    "strategy.sector_approved",
                    ActivityCategory::Strategy,
                    format!("Approved sector {}", sector.sector),
                );
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::TabSelected(tab) => {
                self.active_tab = tab;
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::LeadsReplaced(leads) => {
                let count = leads.len();
                self.leads = leads;
                self.note(
                    correlation_id,
                    "leads.replaced",
                    ActivityCategory::Leads,
                    format!("Loaded {count} leads"),
                );
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::ScoreRecorded { lead_id, score } => {
                if let Some(lead) = self.leads.iter_mut().find(|lead| lead.id == lead_id) {
                    lead.score = score.score;
                    lead.status = LeadStatus::Scored;
                }
                self.lead_scores.insert(lead_id, score);
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::DraftQueued(draft) => {
                self.email_queue.push(draft);
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::FollowUpQueued { after, draft } => {
                if !self.email_queue.iter().any(|queued| queued.id == after) {
                    return Err(DomainError::InvariantViolation(format!(
                        "email draft `{}` is no longer queued",
                        after.0
                    )));
                }
                self.email_queue.push(draft);
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::DraftStatusChanged { draft_id, status } => {
                let draft = self
                    .email_queue
                    .iter_mut()
                    .find(|draft| draft.id == draft_id)
                    .ok_or_else(|| {
                        DomainError::InvariantViolation(format!(
                            "email draft `{}` is not queued",
                            draft_id.0
                        ))
                    })?;
                draft.status = status;
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::CampaignRunning(running) => {
                self.campaign_running = running;
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::CallStarted(call) => {
                if let Some(previous) = self.active_call.take() {
                    self.call_history.push(previous);
                }
                self.active_call = Some(call);
                self.active_tab = ActiveTab::Calls;
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::CallUpdated(update) => {
                let call = self
                    .active_call
                    .as_mut()
                    .filter(|call| call.id == update.call_id)
                    .ok_or_else(|| {
                        DomainError::InvariantViolation(format!(
                            "call `{}` is not the active call",
                            update.call_id.0
                        ))
                    })?;
                call.status = update.status;
                if let Some(duration_secs) = update.duration_secs {
                    call.duration_secs = duration_secs;
                }
                if let Some(transcript) = update.transcript {
                    call.transcript = transcript;
                }
                if update.sentiment.is_some() {
                    call.sentiment = update.sentiment;
                }
                if update.status.is_terminal() {
                    if let Some(finished) = self.active_call.take() {
                        self.call_history.push(finished);
                    }
                }
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::ConfigUpdated(config) => {
                self.campaign_config = config;
                Ok(ReduceOutcome::Updated)
            }
            StoreAction::ActivityRecorded(entry) => {
                self.activity_log.record(entry);
                Ok(ReduceOutcome::Updated)
            }
        }
    }

    pub fn lead(&self, lead_id: &LeadId) -> Option<&Lead> {
        self.leads.iter().find(|lead| &lead.id == lead_id)
    }

    pub fn drafts_with_status(&self, status: EmailStatus) -> Vec<EmailDraft> {
        self.email_queue.iter().filter(|draft| draft.status == status).cloned().collect()
    }

    fn transition(
        &mut self,
        event: StrategyEvent,
        correlation_id: &str,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome = StrategyFlow.apply_with_activity(
            self.strategy_mode,
            &event,
            &mut self.activity_log,
            correlation_id,
        )?;
        self.strategy_mode = outcome.to;
        Ok(outcome)
    }

    fn stale(&self, attempt: u64) -> Option<ReduceOutcome> {
        (attempt != self.analysis_attempt)
            .then_some(ReduceOutcome::StaleAttempt { attempt, current: self.analysis_attempt })
    }

    fn clear_file_input(&mut self) {
        self.current_file = None;
        self.last_error = None;
    }

    fn clear_derived_state(&mut self) {
        self.leads.clear();
        self.lead_scores.clear();
        self.email_queue.clear();
        self.active_call = None;
        self.call_history.clear();
        self.activity_log.clear();
        self.active_analysis = None;
        self.strategy = None;
        self.active_tab = ActiveTab::Strategy;
        self.campaign_running = false;
    }

    fn note(
        &mut self,
        correlation_id: &str,
        event_type: &str,
        category: ActivityCategory,
        message: String,
    ) {
        self.activity_log.record(ActivityEntry::new(
            correlation_id,
            event_type,
            category,
            ActivityOutcome::Success,
            message,
        ));
    }
}
