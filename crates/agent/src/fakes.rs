//! Scripted in-memory gateways for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mission_core::domain::analysis::{AnalysisPayload, SectorInsight};
use mission_core::domain::call::CallId;
use mission_core::domain::campaign::SuggestedConfig;
use mission_core::domain::lead::{
    Lead, LeadId, LeadScore, LeadStatus, ScoreConfidence, ScoringCriteria,
};
use mission_core::domain::strategy::Strategy;
use mission_core::upload::ValidatedDocument;

use crate::gateway::{
    AnalysisGateway, CallGateway, CallRequest, DraftGateway, DraftRequest, DraftedEmail,
    EmailGateway, GatewayError, Gateways, LeadGateway, OutboundEmail, ScoringGateway,
};

pub fn fintech() -> SectorInsight {
    SectorInsight {
        sector: "Fintech".to_string(),
        rationale: "Reconciliation is still manual".to_string(),
        target_roles: vec!["VP Finance".to_string(), "Controller".to_string()],
        value_proposition: "Close the books in a day".to_string(),
        pain_points: vec!["manual reconciliation".to_string()],
        strategy_mix: Some("email + voice".to_string()),
    }
}

pub fn payload() -> AnalysisPayload {
    AnalysisPayload {
        summary: "Automated reconciliation for B2B payments".to_string(),
        sectors: vec![fintech()],
        suggested_config: Some(SuggestedConfig {
            outbound_voice: Some(true),
            ..SuggestedConfig::default()
        }),
    }
}

pub fn lead(id: &str, title: Option<&str>) -> Lead {
    Lead {
        id: LeadId(id.to_string()),
        name: format!("Contact {id}"),
        company: format!("{id} Corp"),
        email: format!("{}@example.com", id.to_lowercase()),
        score: 0,
        status: LeadStatus::New,
        title: title.map(str::to_string),
        industry: Some("Fintech".to_string()),
        employee_count: Some(200),
        phone: Some("+15550100".to_string()),
    }
}

pub fn score(value: u8) -> LeadScore {
    LeadScore {
        score: value,
        reasoning: "scripted".to_string(),
        confidence: ScoreConfidence::High,
        key_factors: Vec::new(),
    }
}

pub fn unavailable(endpoint: &str) -> GatewayError {
    GatewayError::Status {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[derive(Default)]
pub struct ScriptedAnalysis {
    script: Mutex<VecDeque<(Duration, Result<AnalysisPayload, GatewayError>)>>,
    calls: AtomicUsize,
}

impl ScriptedAnalysis {
    pub fn new(script: Vec<(Duration, Result<AnalysisPayload, GatewayError>)>) -> Self {
        Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisGateway for ScriptedAnalysis {
    async fn analyze(
        &self,
        _document: &ValidatedDocument,
    ) -> Result<AnalysisPayload, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().await.pop_front();
        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Err(unavailable("analysis")),
        }
    }
}

#[derive(Default)]
pub struct ScriptedLeads {
    script: Mutex<VecDeque<Result<Vec<Lead>, GatewayError>>>,
    pub requests: Mutex<Vec<Strategy>>,
}

impl ScriptedLeads {
    pub fn new(script: Vec<Result<Vec<Lead>, GatewayError>>) -> Self {
        Self { script: Mutex::new(script.into()), requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl LeadGateway for ScriptedLeads {
    async fn fetch_leads(&self, strategy: &Strategy) -> Result<Vec<Lead>, GatewayError> {
        self.requests.lock().await.push(strategy.clone());
        self.script.lock().await.pop_front().unwrap_or_else(|| Err(unavailable("leads")))
    }
}

/// Unscripted leads fail, which exercises the heuristic fallback.
#[derive(Default)]
pub struct ScriptedScoring {
    scores: HashMap<LeadId, u8>,
    pub criteria: Mutex<Vec<ScoringCriteria>>,
}

impl ScriptedScoring {
    pub fn new(scores: &[(&str, u8)]) -> Self {
        Self {
            scores: scores.iter().map(|(id, value)| (LeadId(id.to_string()), *value)).collect(),
            criteria: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ScoringGateway for ScriptedScoring {
    async fn score(
        &self,
        lead: &Lead,
        criteria: &ScoringCriteria,
    ) -> Result<LeadScore, GatewayError> {
        self.criteria.lock().await.push(criteria.clone());
        self.scores.get(&lead.id).map(|value| score(*value)).ok_or_else(|| unavailable("score"))
    }
}

#[derive(Default)]
pub struct ScriptedDrafts {
    failing: bool,
    pub requests: Mutex<Vec<DraftRequest>>,
}

impl ScriptedDrafts {
    pub fn failing() -> Self {
        Self { failing: true, requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl DraftGateway for ScriptedDrafts {
    async fn draft(&self, request: &DraftRequest) -> Result<DraftedEmail, GatewayError> {
        self.requests.lock().await.push(request.clone());
        if self.failing {
            return Err(unavailable("draft"));
        }
        Ok(DraftedEmail {
            subject: format!("Step {} for {}", request.sequence_step, request.company_name),
            body: format!("Hi {},\n\n{}", request.contact_name, request.value_prop),
        })
    }
}

/// Records every accepted email; recipients in `rejecting` fail.
#[derive(Default)]
pub struct RecordingEmail {
    rejecting: HashSet<String>,
    delay: Duration,
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingEmail {
    pub fn rejecting(recipients: &[&str]) -> Self {
        Self {
            rejecting: recipients.iter().map(|recipient| recipient.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Every send takes `delay` before it is accepted.
    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }
}

#[async_trait]
impl EmailGateway for RecordingEmail {
    async fn send(&self, email: &OutboundEmail) -> Result<(), GatewayError> {
        tokio::time::sleep(self.delay).await;
        if self.rejecting.contains(&email.to) {
            return Err(GatewayError::Rejected {
                message: format!("mailbox {} rejected the message", email.to),
                error_type: Some("bounce".to_string()),
            });
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedCalls {
    pub requests: Mutex<Vec<CallRequest>>,
}

#[async_trait]
impl CallGateway for ScriptedCalls {
    async fn trigger(&self, request: &CallRequest) -> Result<CallId, GatewayError> {
        self.requests.lock().await.push(request.clone());
        Ok(CallId(format!("CALL-{}", request.lead_id.0)))
    }
}

/// Concrete handles kept alongside the type-erased [`Gateways`] so tests can
/// inspect what was called.
pub struct Harness {
    pub analysis: Arc<ScriptedAnalysis>,
    pub leads: Arc<ScriptedLeads>,
    pub scoring: Arc<ScriptedScoring>,
    pub drafts: Arc<ScriptedDrafts>,
    pub email: Arc<RecordingEmail>,
    pub calls: Arc<ScriptedCalls>,
}

impl Harness {
    pub fn new(
        analysis: ScriptedAnalysis,
        leads: ScriptedLeads,
        scoring: ScriptedScoring,
        drafts: ScriptedDrafts,
        email: RecordingEmail,
    ) -> Self {
        Self {
            analysis: Arc::new(analysis),
            leads: Arc::new(leads),
            scoring: Arc::new(scoring),
            drafts: Arc::new(drafts),
            email: Arc::new(email),
            calls: Arc::new(ScriptedCalls::default()),
        }
    }

    pub fn gateways(&self) -> Gateways {
        Gateways {
            analysis: self.analysis.clone(),
            leads: self.leads.clone(),
            scoring: self.scoring.clone(),
            drafts: self.drafts.clone(),
            email: self.email.clone(),
            calls: self.calls.clone(),
        }
    }
}
