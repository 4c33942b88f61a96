//! Email queue runner. Sends queued drafts one at a time with a fixed delay
//! between sends and schedules the next sequence step for every delivery.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use mission_core::activity::{ActivityCategory, ActivityEntry, ActivityOutcome};
use mission_core::domain::email::{EmailDraft, EmailDraftId, EmailStatus};
use mission_core::domain::lead::{Lead, LeadId};
use mission_core::store::StoreAction;

use crate::cancel::CancellationToken;
use crate::gateway::{DraftGateway, DraftRequest, EmailGateway, OutboundEmail};
use crate::render::EmailRenderer;
use crate::store::CampaignStore;

pub const DEFAULT_SEND_THROTTLE: Duration = Duration::from_millis(2_000);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftOutcome {
    pub draft_id: EmailDraftId,
    pub lead_id: LeadId,
    pub result: Result<(), String>,
    pub follow_up: Option<EmailDraftId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub outcomes: Vec<DraftOutcome>,
}

impl CampaignReport {
    fn push(&mut self, outcome: DraftOutcome) {
        self.attempted += 1;
        if outcome.result.is_ok() {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Clone)]
pub struct CampaignRunner {
    store: CampaignStore,
    email: Arc<dyn EmailGateway>,
    drafts: Arc<dyn DraftGateway>,
    renderer: Arc<EmailRenderer>,
    throttle: Duration,
}

impl CampaignRunner {
    pub fn new(
        store: CampaignStore,
        email: Arc<dyn EmailGateway>,
        drafts: Arc<dyn DraftGateway>,
        renderer: Arc<EmailRenderer>,
        throttle: Duration,
    ) -> Self {
        Self { store, email, drafts, renderer, throttle }
    }

    /// Sends every draft queued with status `draft` when the run starts.
    /// Drafts added while running wait for the next run.
    pub async fn run(&self, token: CancellationToken, correlation_id: &str) -> CampaignReport {
        let queued = self.store.read(|state| state.drafts_with_status(EmailStatus::Draft)).await;
        let _ = self.store.dispatch(StoreAction::CampaignRunning(true), correlation_id).await;
        info!(
            event_name = "campaign.started",
            correlation_id,
            queued = queued.len(),
            throttle_ms = self.throttle.as_millis() as u64,
            "email campaign started"
        );

        let mut report = CampaignReport::default();
        for (index, draft) in queued.iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(self.throttle) => {}
                }
            }
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.push(self.send_draft(draft, &token, correlation_id).await);
        }

        let _ = self.store.dispatch(StoreAction::CampaignRunning(false), correlation_id).await;
        info!(
            event_name = "campaign.finished",
            correlation_id,
            attempted = report.attempted,
            sent = report.sent,
            failed = report.failed,
            cancelled = report.cancelled,
            "email campaign finished"
        );
        report
    }

    async fn send_draft(
        &self,
        draft: &EmailDraft,
        token: &CancellationToken,
        correlation_id: &str,
    ) -> DraftOutcome {
        let lead = self.store.read(|state| state.lead(&draft.lead_id).cloned()).await;
        let delivered = match &lead {
            Some(lead) => self.deliver(draft, lead).await,
            None => Err(format!("lead `{}` is no longer in the lead list", draft.lead_id.0)),
        };

        let status = if delivered.is_ok() { EmailStatus::Sent } else { EmailStatus::Failed };
        let still_queued = match self
            .store
            .dispatch(
                StoreAction::DraftStatusChanged { draft_id: draft.id.clone(), status },
                correlation_id,
            )
            .await
        {
            Ok(_) => true,
            Err(error) => {
                warn!(
                    event_name = "campaign.status_update_skipped",
                    correlation_id,
                    draft_id = %draft.id.0,
                    error = %error,
                    "draft left the queue while sending"
                );
                false
            }
        };

        let follow_up = match (&delivered, &lead) {
            (Ok(()), Some(lead)) => {
                self.note(correlation_id, draft, ActivityOutcome::Success, "Email sent".to_string())
                    .await;
                // A reset or stop during the send ends the sequence here.
                if still_queued && !token.is_cancelled() {
                    self.schedule_follow_up(draft, lead, correlation_id).await
                } else {
                    None
                }
            }
            (Err(message), _) => {
                warn!(
                    event_name = "campaign.send_failed",
                    correlation_id,
                    lead_id = %draft.lead_id.0,
                    draft_id = %draft.id.0,
                    error = %message,
                    "email send failed"
                );
                self.note(correlation_id, draft, ActivityOutcome::Failed, message.clone()).await;
                None
            }
            (Ok(()), None) => None,
        };

        DraftOutcome {
            draft_id: draft.id.clone(),
            lead_id: draft.lead_id.clone(),
            result: delivered,
            follow_up,
        }
    }

    async fn deliver(&self, draft: &EmailDraft, lead: &Lead) -> Result<(), String> {
        let html = self
            .renderer
            .render(draft, lead)
            .map_err(|error| format!("email template failed to render: {error}"))?;
        let email = OutboundEmail { to: lead.email.clone(), subject: draft.subject.clone(), html };
        self.email.send(&email).await.map_err(|error| error.to_string())
    }

    async fn schedule_follow_up(
        &self,
        sent: &EmailDraft,
        lead: &Lead,
        correlation_id: &str,
    ) -> Option<EmailDraftId> {
        let step = sent.next_step()?;
        let request = self.store.read(|state| DraftRequest::for_lead(state, lead, step)).await;

        match self.drafts.draft(&request).await {
            Ok(email) => {
                let mut follow_up =
                    EmailDraft::new(lead.id.clone(), email.subject, email.body, step);
                follow_up.status = EmailStatus::Scheduled;
                let id = follow_up.id.clone();
                let queued =
                    StoreAction::FollowUpQueued { after: sent.id.clone(), draft: follow_up };
                self.store.dispatch(queued, correlation_id).await.ok().map(|_| id)
            }
            Err(error) => {
                warn!(
                    event_name = "campaign.follow_up_failed",
                    correlation_id,
                    lead_id = %lead.id.0,
                    step,
                    error = %error,
                    "follow-up draft failed"
                );
                None
            }
        }
    }

    async fn note(
        &self,
        correlation_id: &str,
        draft: &EmailDraft,
        outcome: ActivityOutcome,
        message: String,
    ) {
        let event_type = match outcome {
            ActivityOutcome::Success => "email.sent",
            _ => "email.send_failed",
        };
        let entry = ActivityEntry::new(
            correlation_id,
            event_type,
            ActivityCategory::Email,
            outcome,
            message,
        )
        .with_metadata("lead_id", draft.lead_id.0.clone())
        .with_metadata("step", draft.sequence_step.to_string());
        self.store.record(entry).await;
    }
}
