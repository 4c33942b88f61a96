use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use mission_core::config::GatewayConfig;
use mission_core::domain::analysis::AnalysisPayload;
use mission_core::domain::call::CallId;
use mission_core::domain::lead::{Lead, LeadScore, ScoringCriteria};
use mission_core::domain::strategy::Strategy;
use mission_core::upload::ValidatedDocument;

use crate::gateway::{
    AnalysisGateway, CallGateway, CallRequest, CallResponse, DraftGateway, DraftRequest,
    DraftedEmail, EmailGateway, GatewayError, LeadGateway, LeadSearchRequest, LeadSearchResponse,
    OutboundEmail, ScoreRequest, ScoringGateway, SendResponse,
};
use crate::json::parse_lenient;

/// Client for the hosted JSON API routes.
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|error| GatewayError::Transport {
                endpoint: config.base_url.clone(),
                message: error.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn client(&self) -> reqwest::Client {
        self.http.clone()
    }

    fn request(&self, path: &str) -> (String, reqwest::RequestBuilder) {
        let endpoint = self.config.endpoint(path);
        let mut builder = self.http.post(&endpoint);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        (endpoint, builder)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let (endpoint, builder) = self.request(path);
        debug!(event_name = "gateway.request", endpoint = %endpoint, "calling gateway");
        let response = builder.json(body).send().await.map_err(|error| GatewayError::Transport {
            endpoint: endpoint.clone(),
            message: error.to_string(),
        })?;
        read_body(endpoint, response).await
    }
}

async fn read_body<R>(endpoint: String, response: reqwest::Response) -> Result<R, GatewayError>
where
    R: DeserializeOwned + Send,
{
    let status = response.status();
    let text = response.text().await.map_err(|error| GatewayError::Transport {
        endpoint: endpoint.clone(),
        message: error.to_string(),
    })?;

    if !status.is_success() {
        return Err(GatewayError::Status { endpoint, status: status.as_u16(), body: text });
    }

    parse_lenient::<R>(&text).map_err(|message| GatewayError::Parse { endpoint, message })
}

#[async_trait]
impl AnalysisGateway for HttpGateway {
    async fn analyze(&self, document: &ValidatedDocument) -> Result<AnalysisPayload, GatewayError> {
        let (endpoint, builder) = self.request(&self.config.analyze_path);
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(document.kind.mime_type())
            .map_err(|error| GatewayError::Transport {
                endpoint: endpoint.clone(),
                message: error.to_string(),
            })?;
        let form = Form::new().part("file", part);

        let response = builder.multipart(form).send().await.map_err(|error| {
            GatewayError::Transport { endpoint: endpoint.clone(), message: error.to_string() }
        })?;
        let payload: AnalysisPayload = read_body(endpoint.clone(), response).await?;
        payload.validate().map_err(|message| GatewayError::Parse { endpoint, message })?;
        Ok(payload)
    }
}

#[async_trait]
impl LeadGateway for HttpGateway {
    async fn fetch_leads(&self, strategy: &Strategy) -> Result<Vec<Lead>, GatewayError> {
        let response: LeadSearchResponse = self
            .post_json(&self.config.leads_path, &LeadSearchRequest { strategy: strategy.clone() })
            .await?;
        if !response.success {
            return Err(GatewayError::Rejected {
                message: response
                    .message
                    .unwrap_or_else(|| "Lead search was not successful".to_string()),
                error_type: response.error_type,
            });
        }
        Ok(response.leads)
    }
}

#[async_trait]
impl ScoringGateway for HttpGateway {
    async fn score(
        &self,
        lead: &Lead,
        criteria: &ScoringCriteria,
    ) -> Result<LeadScore, GatewayError> {
        let mut score: LeadScore = self
            .post_json(
                &self.config.score_path,
                &ScoreRequest { lead: lead.clone(), prd_criteria: criteria.clone() },
            )
            .await?;
        score.score = score.score.min(100);
        Ok(score)
    }
}

#[async_trait]
impl DraftGateway for HttpGateway {
    async fn draft(&self, request: &DraftRequest) -> Result<DraftedEmail, GatewayError> {
        self.post_json(&self.config.draft_path, request).await
    }
}

#[async_trait]
impl EmailGateway for HttpGateway {
    async fn send(&self, email: &OutboundEmail) -> Result<(), GatewayError> {
        let response: SendResponse = self.post_json(&self.config.send_path, email).await?;
        if response.success {
            Ok(())
        } else {
            Err(GatewayError::Rejected {
                message: response.error.unwrap_or_else(|| "Email was not accepted".to_string()),
                error_type: None,
            })
        }
    }
}

#[async_trait]
impl CallGateway for HttpGateway {
    async fn trigger(&self, request: &CallRequest) -> Result<CallId, GatewayError> {
        let response: CallResponse = self.post_json(&self.config.call_path, request).await?;
        match (response.success, response.call_id) {
            (true, Some(call_id)) => Ok(call_id),
            (true, None) => Err(GatewayError::Parse {
                endpoint: self.config.endpoint(&self.config.call_path),
                message: "call accepted without a callId".to_string(),
            }),
            (false, _) => Err(GatewayError::Rejected {
                message: response.message.unwrap_or_else(|| "Call could not be placed".to_string()),
                error_type: None,
            }),
        }
    }
}
