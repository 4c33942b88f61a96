//! Seams to the hosted APIs the orchestration layer drives.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mission_core::domain::analysis::AnalysisPayload;
use mission_core::domain::call::CallId;
use mission_core::domain::lead::{Lead, LeadId, LeadScore, ScoringCriteria};
use mission_core::domain::strategy::Strategy;
use mission_core::store::CampaignState;
use mission_core::upload::ValidatedDocument;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status { endpoint: String, status: u16, body: String },
    #[error("unreadable response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },
    #[error("{message}")]
    Rejected { message: String, error_type: Option<String> },
    #[error("analysis provider failed: {0}")]
    Provider(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSearchRequest {
    pub strategy: Strategy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSearchResponse {
    pub success: bool,
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub lead: Lead,
    pub prd_criteria: ScoringCriteria,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    pub lead_id: LeadId,
    pub company_name: String,
    pub contact_name: String,
    pub role: String,
    pub rationale: String,
    pub value_prop: String,
    #[serde(default = "first_step")]
    pub sequence_step: u8,
}

fn first_step() -> u8 {
    1
}

impl DraftRequest {
    /// Builds the draft request for `lead` from the approved strategy and the
    /// matching sector of the active analysis.
    pub fn for_lead(state: &CampaignState, lead: &Lead, sequence_step: u8) -> Self {
        let strategy = state.strategy.as_ref();
        let sector = strategy.and_then(|strategy| {
            state.active_analysis.as_ref().and_then(|analysis| analysis.sector(&strategy.industry))
        });

        Self {
            lead_id: lead.id.clone(),
            company_name: lead.company.clone(),
            contact_name: lead.name.clone(),
            role: lead
                .title
                .clone()
                .or_else(|| strategy.and_then(|strategy| strategy.target_role.clone()))
                .unwrap_or_default(),
            rationale: strategy
                .and_then(|strategy| strategy.rationale.clone())
                .unwrap_or_default(),
            value_prop: sector.map(|sector| sector.value_proposition.clone()).unwrap_or_default(),
            sequence_step,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedEmail {
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub lead_id: LeadId,
    pub phone: String,
    pub name: String,
    pub rationale: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub success: bool,
    #[serde(default)]
    pub call_id: Option<CallId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, document: &ValidatedDocument) -> Result<AnalysisPayload, GatewayError>;
}

#[async_trait]
pub trait LeadGateway: Send + Sync {
    async fn fetch_leads(&self, strategy: &Strategy) -> Result<Vec<Lead>, GatewayError>;
}

#[async_trait]
pub trait ScoringGateway: Send + Sync {
    async fn score(
        &self,
        lead: &Lead,
        criteria: &ScoringCriteria,
    ) -> Result<LeadScore, GatewayError>;
}

#[async_trait]
pub trait DraftGateway: Send + Sync {
    async fn draft(&self, request: &DraftRequest) -> Result<DraftedEmail, GatewayError>;
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait CallGateway: Send + Sync {
    async fn trigger(&self, request: &CallRequest) -> Result<CallId, GatewayError>;
}

/// One handle per external API.
#[derive(Clone)]
pub struct Gateways {
    pub analysis: Arc<dyn AnalysisGateway>,
    pub leads: Arc<dyn LeadGateway>,
    pub scoring: Arc<dyn ScoringGateway>,
    pub drafts: Arc<dyn DraftGateway>,
    pub email: Arc<dyn EmailGateway>,
    pub calls: Arc<dyn CallGateway>,
}

#[cfg(test)]
mod tests {
    use super::LeadSearchResponse;

    #[test]
    fn lead_search_accepts_leads_without_ids() {
        let response: LeadSearchResponse = serde_json::from_str(
            r#"{"success":true,"leads":[{"name":"Ada","company":"Engines","email":"a@e.com"}]}"#,
        )
        .expect("response parses");

        assert_eq!(response.leads.len(), 1);
        assert!(response.leads[0].id.0.starts_with("LEAD-"));
        assert_eq!(response.leads[0].company, "Engines");
    }
}
