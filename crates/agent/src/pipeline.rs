//! Lead pipeline sequencer: one lead search, a concurrent scoring fan-out
//! over the top leads, and automatic drafts for strong fits.

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use mission_core::activity::{ActivityCategory, ActivityEntry, ActivityOutcome};
use mission_core::domain::email::EmailDraft;
use mission_core::domain::lead::{Lead, LeadId, ScoringCriteria};
use mission_core::errors::{ApplicationError, DomainError};
use mission_core::scoring::{fallback_score, AUTO_DRAFT_THRESHOLD};
use mission_core::store::{CampaignState, StoreAction};

use crate::gateway::{DraftRequest, Gateways};
use crate::store::CampaignStore;

pub const DEFAULT_SCORING_FANOUT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    pub scoring_fanout: usize,
    pub auto_draft_threshold: u8,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { scoring_fanout: DEFAULT_SCORING_FANOUT, auto_draft_threshold: AUTO_DRAFT_THRESHOLD }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreSource {
    Gateway,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadScoringOutcome {
    pub lead_id: LeadId,
    pub score: u8,
    pub source: ScoreSource,
    pub drafted: bool,
}

/// In-flight scoring tasks. Dropping the handle aborts them, so callers that
/// do not wait must [`detach`](Self::detach).
pub struct ScoringHandle {
    lead_count: usize,
    tasks: JoinSet<LeadScoringOutcome>,
}

impl ScoringHandle {
    /// Leads returned by the search, scored or not.
    pub fn lead_count(&self) -> usize {
        self.lead_count
    }

    pub fn scoring_count(&self) -> usize {
        self.tasks.len()
    }

    /// Outcomes in completion order.
    pub async fn wait(mut self) -> Vec<LeadScoringOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => warn!(
                    event_name = "pipeline.scoring_task_failed",
                    error = %error,
                    "scoring task did not finish"
                ),
            }
        }
        outcomes
    }

    pub fn detach(self) {
        tokio::spawn(async move {
            self.wait().await;
        });
    }
}

#[derive(Clone)]
pub struct LeadPipeline {
    store: CampaignStore,
    gateways: Gateways,
    settings: PipelineSettings,
}

impl LeadPipeline {
    pub fn new(store: CampaignStore, gateways: Gateways, settings: PipelineSettings) -> Self {
        Self { store, gateways, settings }
    }

    /// Replaces the lead list from the lead gateway and starts scoring the
    /// top leads. Returns once the leads are stored.
    pub async fn generate(&self, correlation_id: &str) -> Result<ScoringHandle, ApplicationError> {
        let (strategy, criteria) =
            self.store.read(|state| (state.strategy.clone(), scoring_criteria(state))).await;
        let Some(strategy) = strategy else {
            return Err(DomainError::InvariantViolation(
                "Approve a sector before generating leads".to_string(),
            )
            .into());
        };

        info!(
            event_name = "pipeline.lead_search_started",
            correlation_id,
            industry = %strategy.industry,
            "searching for leads"
        );
        let leads = match self.gateways.leads.fetch_leads(&strategy).await {
            Ok(leads) => leads,
            Err(error) => {
                warn!(
                    event_name = "pipeline.lead_search_failed",
                    correlation_id,
                    error = %error,
                    "lead gateway failed"
                );
                self.store
                    .record(ActivityEntry::new(
                        correlation_id,
                        "leads.search_failed",
                        ActivityCategory::Leads,
                        ActivityOutcome::Failed,
                        error.to_string(),
                    ))
                    .await;
                return Err(ApplicationError::Integration(error.to_string()));
            }
        };

        let lead_count = leads.len();
        let top: Vec<Lead> = leads.iter().take(self.settings.scoring_fanout).cloned().collect();
        self.store.dispatch(StoreAction::LeadsReplaced(leads), correlation_id).await?;

        let mut tasks = JoinSet::new();
        for lead in top {
            let pipeline = self.clone();
            let criteria = criteria.clone();
            let correlation_id = correlation_id.to_string();
            tasks.spawn(async move { pipeline.score_lead(lead, criteria, correlation_id).await });
        }
        info!(
            event_name = "pipeline.scoring_started",
            correlation_id,
            leads = lead_count,
            scoring = tasks.len(),
            "scoring top leads"
        );

        Ok(ScoringHandle { lead_count, tasks })
    }

    async fn score_lead(
        &self,
        lead: Lead,
        criteria: ScoringCriteria,
        correlation_id: String,
    ) -> LeadScoringOutcome {
        let correlation_id = correlation_id.as_str();
        let (score, source) = match self.gateways.scoring.score(&lead, &criteria).await {
            Ok(score) => (score, ScoreSource::Gateway),
            Err(error) => {
                warn!(
                    event_name = "pipeline.scoring_fallback",
                    correlation_id,
                    lead_id = %lead.id.0,
                    error = %error,
                    "scoring gateway failed; using heuristic score"
                );
                self.store
                    .record(
                        ActivityEntry::new(
                            correlation_id,
                            "scoring.fallback_used",
                            ActivityCategory::Scoring,
                            ActivityOutcome::Failed,
                            error.to_string(),
                        )
                        .with_metadata("lead_id", lead.id.0.clone()),
                    )
                    .await;
                (fallback_score(&lead, &criteria), ScoreSource::Fallback)
            }
        };

        let value = score.score;
        let recorded = StoreAction::ScoreRecorded { lead_id: lead.id.clone(), score };
        let _ = self.store.dispatch(recorded, correlation_id).await;
        debug!(
            event_name = "pipeline.score_recorded",
            correlation_id,
            lead_id = %lead.id.0,
            score = value,
            source = ?source,
            "lead scored"
        );

        let drafted = value >= self.settings.auto_draft_threshold
            && self.draft_first_touch(&lead.id, correlation_id).await;

        LeadScoringOutcome { lead_id: lead.id, score: value, source, drafted }
    }

    async fn draft_first_touch(&self, lead_id: &LeadId, correlation_id: &str) -> bool {
        let request = self
            .store
            .read(|state| state.lead(lead_id).map(|lead| DraftRequest::for_lead(state, lead, 1)))
            .await;
        let Some(request) = request else {
            debug!(
                event_name = "pipeline.draft_skipped",
                correlation_id,
                lead_id = %lead_id.0,
                "lead was replaced before drafting"
            );
            return false;
        };

        match self.gateways.drafts.draft(&request).await {
            Ok(email) => {
                let draft = EmailDraft::new(lead_id.clone(), email.subject, email.body, 1);
                let _ = self.store.dispatch(StoreAction::DraftQueued(draft), correlation_id).await;
                self.store
                    .record(
                        ActivityEntry::new(
                            correlation_id,
                            "email.drafted",
                            ActivityCategory::Email,
                            ActivityOutcome::Success,
                            format!("Drafted outreach for {}", request.company_name),
                        )
                        .with_metadata("lead_id", lead_id.0.clone()),
                    )
                    .await;
                true
            }
            Err(error) => {
                warn!(
                    event_name = "pipeline.draft_failed",
                    correlation_id,
                    lead_id = %lead_id.0,
                    error = %error,
                    "auto draft failed"
                );
                self.store
                    .record(
                        ActivityEntry::new(
                            correlation_id,
                            "email.draft_failed",
                            ActivityCategory::Email,
                            ActivityOutcome::Failed,
                            error.to_string(),
                        )
                        .with_metadata("lead_id", lead_id.0.clone()),
                    )
                    .await;
                false
            }
        }
    }
}

/// Strategy fields plus the pain points of the matching analysed sector.
fn scoring_criteria(state: &CampaignState) -> ScoringCriteria {
    let Some(strategy) = &state.strategy else {
        return ScoringCriteria::default();
    };
    let pain_points = state
        .active_analysis
        .as_ref()
        .and_then(|analysis| analysis.sector(&strategy.industry))
        .map(|sector| sector.pain_points.clone())
        .unwrap_or_default();

    ScoringCriteria {
        target_role: strategy.target_role.clone(),
        sector: Some(strategy.industry.clone()),
        pain_points,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use mission_core::domain::analysis::{AnalysisId, AnalysisResult};
    use mission_core::domain::email::EmailStatus;
    use mission_core::domain::lead::{LeadId, LeadStatus};
    use mission_core::errors::{ApplicationError, DomainError};
    use mission_core::store::{CampaignState, StoreAction};

    use super::{LeadPipeline, PipelineSettings, ScoreSource};
    use crate::fakes::{
        fintech, lead, unavailable, Harness, RecordingEmail, ScriptedAnalysis, ScriptedDrafts,
        ScriptedLeads, ScriptedScoring,
    };
    use crate::store::CampaignStore;

    async fn approved_store() -> CampaignStore {
        let mut state = CampaignState::default();
        state.active_analysis = Some(AnalysisResult {
            id: AnalysisId("ANL-1".to_string()),
            file_name: "prd.pdf".to_string(),
            timestamp: Utc::now(),
            summary: "payments".to_string(),
            sectors: vec![fintech()],
        });
        state.reduce(StoreAction::SectorApproved(fintech()), "setup").expect("approve");
        CampaignStore::new(state)
    }

    fn harness(leads: ScriptedLeads, scoring: ScriptedScoring, drafts: ScriptedDrafts) -> Harness {
        Harness::new(ScriptedAnalysis::default(), leads, scoring, drafts, RecordingEmail::default())
    }

    #[tokio::test]
    async fn generating_without_strategy_is_rejected() {
        let fakes =
            harness(
                ScriptedLeads::default(),
                ScriptedScoring::default(),
                ScriptedDrafts::default(),
            );
        let pipeline = LeadPipeline::new(
            CampaignStore::default(),
            fakes.gateways(),
            PipelineSettings::default(),
        );

        let error = pipeline.generate("c-1").await.err().expect("needs a strategy");

        assert!(matches!(error, ApplicationError::Domain(DomainError::InvariantViolation(_))));
        assert!(fakes.leads.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn only_top_leads_are_scored_and_strong_fits_are_drafted() {
        let leads: Vec<_> =
            (1..=7).map(|index| lead(&format!("L{index}"), Some("Analyst"))).collect();
        let fakes = harness(
            ScriptedLeads::new(vec![Ok(leads)]),
            ScriptedScoring::new(&[("L1", 92), ("L2", 40), ("L3", 80), ("L4", 79), ("L5", 10)]),
            ScriptedDrafts::default(),
        );
        let store = approved_store().await;
        let pipeline =
            LeadPipeline::new(store.clone(), fakes.gateways(), PipelineSettings::default());

        let handle = pipeline.generate("c-2").await.expect("generate");
        assert_eq!(handle.lead_count(), 7);
        assert_eq!(handle.scoring_count(), 5);
        let outcomes = handle.wait().await;

        assert_eq!(outcomes.len(), 5);
        let mut drafted: Vec<_> = outcomes
            .iter()
            .filter(|outcome| outcome.drafted)
            .map(|outcome| outcome.lead_id.0.clone())
            .collect();
        drafted.sort();
        assert_eq!(drafted, vec!["L1".to_string(), "L3".to_string()]);

        let state = store.snapshot().await;
        assert_eq!(state.leads.len(), 7);
        assert_eq!(state.lead_scores.len(), 5);
        assert_eq!(state.lead(&LeadId("L1".to_string())).map(|lead| lead.score), Some(92));
        assert_eq!(
            state.lead(&LeadId("L6".to_string())).map(|lead| lead.status),
            Some(LeadStatus::New)
        );
        assert_eq!(state.drafts_with_status(EmailStatus::Draft).len(), 2);

        let criteria = fakes.scoring.criteria.lock().await;
        assert_eq!(criteria[0].sector.as_deref(), Some("Fintech"));
        assert_eq!(criteria[0].target_role.as_deref(), Some("VP Finance"));
        assert_eq!(criteria[0].pain_points, vec!["manual reconciliation".to_string()]);

        let requests = fakes.drafts.requests.lock().await;
        assert!(requests.iter().all(|request| request.value_prop == "Close the books in a day"));
    }

    #[tokio::test]
    async fn scoring_failure_falls_back_to_heuristic() {
        let fakes = harness(
            ScriptedLeads::new(vec![Ok(vec![lead("L1", Some("VP Finance"))])]),
            ScriptedScoring::default(),
            ScriptedDrafts::default(),
        );
        let store = approved_store().await;
        let pipeline =
            LeadPipeline::new(store.clone(), fakes.gateways(), PipelineSettings::default());

        let outcomes = pipeline.generate("c-3").await.expect("generate").wait().await;

        // title +25, senior +15, sector +15, size +10 on top of 50
        assert_eq!(outcomes[0].source, ScoreSource::Fallback);
        assert_eq!(outcomes[0].score, 100);
        assert!(outcomes[0].drafted);
        let state = store.snapshot().await;
        assert!(state
            .activity_log
            .entries()
            .iter()
            .any(|entry| entry.event_type == "scoring.fallback_used"));
    }

    #[tokio::test]
    async fn draft_failure_is_swallowed() {
        let fakes = harness(
            ScriptedLeads::new(vec![Ok(vec![lead("L1", None)])]),
            ScriptedScoring::new(&[("L1", 95)]),
            ScriptedDrafts::failing(),
        );
        let store = approved_store().await;
        let pipeline =
            LeadPipeline::new(store.clone(), fakes.gateways(), PipelineSettings::default());

        let outcomes = pipeline.generate("c-4").await.expect("generate").wait().await;

        assert_eq!(outcomes[0].score, 95);
        assert!(!outcomes[0].drafted);
        let state = store.snapshot().await;
        assert!(state.email_queue.is_empty());
        assert_eq!(state.lead_scores.len(), 1);
    }

    #[tokio::test]
    async fn lead_gateway_failure_keeps_previous_leads() {
        let fakes = harness(
            ScriptedLeads::new(vec![Ok(vec![lead("L1", None)]), Err(unavailable("leads"))]),
            ScriptedScoring::new(&[("L1", 50)]),
            ScriptedDrafts::default(),
        );
        let store = approved_store().await;
        let pipeline =
            LeadPipeline::new(store.clone(), fakes.gateways(), PipelineSettings::default());
        pipeline.generate("c-5").await.expect("first search").wait().await;

        let error = pipeline.generate("c-6").await.err().expect("second search fails");

        assert!(matches!(error, ApplicationError::Integration(_)));
        let state = store.snapshot().await;
        assert_eq!(state.leads.len(), 1);
        assert!(state
            .activity_log
            .entries()
            .iter()
            .any(|entry| entry.event_type == "leads.search_failed"));
    }

    #[tokio::test]
    async fn scores_survive_lead_replacement() {
        let fakes = harness(
            ScriptedLeads::new(vec![Ok(vec![lead("L1", None)]), Ok(vec![lead("L2", None)])]),
            ScriptedScoring::new(&[("L1", 60), ("L2", 70)]),
            ScriptedDrafts::default(),
        );
        let store = approved_store().await;
        let pipeline =
            LeadPipeline::new(store.clone(), fakes.gateways(), PipelineSettings::default());

        pipeline.generate("c-7").await.expect("first").wait().await;
        pipeline.generate("c-8").await.expect("second").wait().await;

        let state = store.snapshot().await;
        assert_eq!(state.leads.len(), 1);
        assert!(state.lead_scores.contains_key(&LeadId("L1".to_string())));
        assert!(state.lead_scores.contains_key(&LeadId("L2".to_string())));
    }
}
