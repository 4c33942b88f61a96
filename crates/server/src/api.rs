use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use mission_agent::MissionControl;
use mission_core::domain::call::{Call, CallUpdate};
use mission_core::domain::campaign::CampaignConfig;
use mission_core::domain::lead::LeadId;
use mission_core::domain::strategy::Strategy;
use mission_core::errors::{ApplicationError, DomainError, InterfaceError};
use mission_core::store::CampaignState;
use mission_core::upload::DocumentUpload;

/// Headroom for multipart framing on top of the document itself, so an
/// oversized document is rejected by upload validation rather than by the
/// body limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct ApiState {
    control: MissionControl,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisAccepted {
    pub attempt: u64,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveSectorRequest {
    pub sector: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsAccepted {
    pub leads: usize,
    pub scoring: usize,
    pub correlation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignToggle {
    pub running: bool,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest {
    pub lead_id: LeadId,
}

pub fn router(control: MissionControl, max_upload_bytes: u64) -> Router {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api/state", get(current_state))
        .route("/api/strategy/analyze", post(analyze_document))
        .route("/api/strategy/retry", post(retry_analysis))
        .route("/api/strategy/cancel", post(cancel_analysis))
        .route("/api/strategy/reset", post(reset_state))
        .route("/api/strategy/approve", post(approve_sector))
        .route("/api/leads/generate", post(generate_leads))
        .route("/api/campaign/start", post(start_campaign))
        .route("/api/campaign/stop", post(stop_campaign))
        .route("/api/campaign/config", put(update_config))
        .route("/api/calls", post(start_call))
        .route("/api/calls/active", post(update_active_call))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(ApiState { control })
}

fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

fn error_response(error: ApplicationError, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    info!(
        event_name = "api.request_failed",
        correlation_id,
        status = status.as_u16(),
        error = %interface,
        "request failed"
    );

    (
        status,
        Json(ApiError {
            error: interface.user_message().to_string(),
            detail: interface.message().to_string(),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

fn bad_request(detail: String, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    error_response(
        ApplicationError::Domain(DomainError::InvariantViolation(detail)),
        correlation_id,
    )
}

pub async fn current_state(State(state): State<ApiState>) -> Json<CampaignState> {
    Json(state.control.state().await)
}

pub async fn analyze_document(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AnalysisAccepted>)> {
    let correlation_id = correlation_id();
    let mut upload = None;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|error| bad_request(format!("malformed upload: {error}"), &correlation_id))?;
        let Some(field) = field else {
            break;
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|error| bad_request(format!("unreadable upload: {error}"), &correlation_id))?;
        upload = Some(DocumentUpload::new(file_name, content_type, bytes.to_vec()));
        break;
    }

    let upload = upload.ok_or_else(|| {
        bad_request("multipart field `file` is required".to_string(), &correlation_id)
    })?;
    let ticket = state
        .control
        .submit_document(upload, &correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;

    Ok((StatusCode::ACCEPTED, Json(AnalysisAccepted { attempt: ticket.attempt, correlation_id })))
}

pub async fn retry_analysis(State(state): State<ApiState>) -> ApiResult<Json<CampaignState>> {
    let correlation_id = correlation_id();
    state
        .control
        .retry(&correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(Json(state.control.state().await))
}

pub async fn cancel_analysis(State(state): State<ApiState>) -> ApiResult<Json<CampaignState>> {
    let correlation_id = correlation_id();
    state
        .control
        .cancel(&correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(Json(state.control.state().await))
}

pub async fn reset_state(State(state): State<ApiState>) -> ApiResult<Json<CampaignState>> {
    let correlation_id = correlation_id();
    state
        .control
        .reset(&correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(Json(state.control.state().await))
}

pub async fn approve_sector(
    State(state): State<ApiState>,
    Json(request): Json<ApproveSectorRequest>,
) -> ApiResult<Json<Strategy>> {
    let correlation_id = correlation_id();
    if request.sector.trim().is_empty() {
        return Err(bad_request("sector is required".to_string(), &correlation_id));
    }
    let strategy = state
        .control
        .approve_sector(&request.sector, &correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(Json(strategy))
}

/// Responds once the lead list is stored; scoring keeps running afterwards.
pub async fn generate_leads(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<LeadsAccepted>)> {
    let correlation_id = correlation_id();
    let handle = state
        .control
        .generate_leads(&correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    let accepted = LeadsAccepted {
        leads: handle.lead_count(),
        scoring: handle.scoring_count(),
        correlation_id,
    };
    handle.detach();
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn start_campaign(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CampaignToggle>)> {
    let correlation_id = correlation_id();
    state
        .control
        .start_campaign(&correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok((StatusCode::ACCEPTED, Json(CampaignToggle { running: true, correlation_id })))
}

pub async fn stop_campaign(State(state): State<ApiState>) -> Json<CampaignToggle> {
    let correlation_id = correlation_id();
    state.control.stop_campaign(&correlation_id).await;
    Json(CampaignToggle { running: false, correlation_id })
}

pub async fn update_config(
    State(state): State<ApiState>,
    Json(config): Json<CampaignConfig>,
) -> ApiResult<Json<CampaignConfig>> {
    let correlation_id = correlation_id();
    state
        .control
        .update_config(config, &correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(Json(config))
}

pub async fn start_call(
    State(state): State<ApiState>,
    Json(request): Json<StartCallRequest>,
) -> ApiResult<Json<Call>> {
    let correlation_id = correlation_id();
    let call = state
        .control
        .trigger_call(&request.lead_id, &correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(Json(call))
}

pub async fn update_active_call(
    State(state): State<ApiState>,
    Json(update): Json<CallUpdate>,
) -> ApiResult<StatusCode> {
    let correlation_id = correlation_id();
    state
        .control
        .record_call_update(update, &correlation_id)
        .await
        .map_err(|error| error_response(error, &correlation_id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{header, Request, StatusCode},
        Json,
    };
    use tower::ServiceExt;

    use mission_agent::gateway::{
        AnalysisGateway, CallGateway, CallRequest, DraftGateway, DraftRequest, DraftedEmail,
        EmailGateway, LeadGateway, OutboundEmail, ScoringGateway,
    };
    use mission_agent::{ControllerSettings, GatewayError, Gateways, MissionControl};
    use mission_core::domain::analysis::{AnalysisPayload, SectorInsight};
    use mission_core::domain::call::CallId;
    use mission_core::domain::lead::{Lead, LeadScore, ScoringCriteria};
    use mission_core::domain::strategy::Strategy;
    use mission_core::flows::StrategyMode;
    use mission_core::store::StoreAction;
    use mission_core::upload::ValidatedDocument;
    use mission_db::InMemoryLocalStateRepository;

    use super::{
        approve_sector, current_state, router, ApiError, ApiState, ApproveSectorRequest,
    };

    struct StubApis;

    fn unreachable_route(endpoint: &str) -> GatewayError {
        GatewayError::Transport { endpoint: endpoint.to_string(), message: "offline".to_string() }
    }

    #[async_trait]
    impl AnalysisGateway for StubApis {
        async fn analyze(
            &self,
            _document: &ValidatedDocument,
        ) -> Result<AnalysisPayload, GatewayError> {
            Ok(AnalysisPayload {
                summary: "stub".to_string(),
                sectors: vec![SectorInsight {
                    sector: "Fintech".to_string(),
                    rationale: "stub".to_string(),
                    target_roles: vec!["CFO".to_string()],
                    value_proposition: "stub".to_string(),
                    pain_points: Vec::new(),
                    strategy_mix: None,
                }],
                suggested_config: None,
            })
        }
    }

    #[async_trait]
    impl LeadGateway for StubApis {
        async fn fetch_leads(&self, _strategy: &Strategy) -> Result<Vec<Lead>, GatewayError> {
            Err(unreachable_route("/api/leads"))
        }
    }

    #[async_trait]
    impl ScoringGateway for StubApis {
        async fn score(
            &self,
            _lead: &Lead,
            _criteria: &ScoringCriteria,
        ) -> Result<LeadScore, GatewayError> {
            Err(unreachable_route("/api/score"))
        }
    }

    #[async_trait]
    impl DraftGateway for StubApis {
        async fn draft(&self, _request: &DraftRequest) -> Result<DraftedEmail, GatewayError> {
            Err(unreachable_route("/api/email/draft"))
        }
    }

    #[async_trait]
    impl EmailGateway for StubApis {
        async fn send(&self, _email: &OutboundEmail) -> Result<(), GatewayError> {
            Err(unreachable_route("/api/email/send"))
        }
    }

    #[async_trait]
    impl CallGateway for StubApis {
        async fn trigger(&self, _request: &CallRequest) -> Result<CallId, GatewayError> {
            Err(unreachable_route("/api/call"))
        }
    }

    fn control() -> MissionControl {
        let apis = Arc::new(StubApis);
        let gateways = Gateways {
            analysis: apis.clone(),
            leads: apis.clone(),
            scoring: apis.clone(),
            drafts: apis.clone(),
            email: apis.clone(),
            calls: apis,
        };
        let settings = ControllerSettings {
            analysis_timeout: Duration::from_secs(5),
            ..ControllerSettings::default()
        };
        MissionControl::new(gateways, Arc::new(InMemoryLocalStateRepository::default()), settings)
            .expect("controller")
    }

    fn multipart_request(file_name: &str, content: &[u8]) -> Request<Body> {
        let boundary = "mission-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::post("/api/strategy/analyze")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn unsupported_upload_is_a_bad_request() {
        let app = router(control(), 10 * 1024 * 1024);

        let response = app.oneshot(multipart_request("deck.pptx", b"slides")).await.expect("call");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = json_body(response).await;
        assert!(error.detail.contains("Unsupported file type"));
        assert!(error.correlation_id.starts_with("req-"));
    }

    #[tokio::test]
    async fn accepted_upload_reaches_complete() {
        let control = control();
        let app = router(control.clone(), 10 * 1024 * 1024);

        let response = app.oneshot(multipart_request("prd.md", b"# PRD")).await.expect("call");
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let mut mode = control.state().await.strategy_mode;
        for _ in 0..50 {
            if mode == StrategyMode::Complete {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            mode = control.state().await.strategy_mode;
        }
        assert_eq!(mode, StrategyMode::Complete);
    }

    #[tokio::test]
    async fn retry_from_idle_is_a_conflict() {
        let app = router(control(), 1024);

        let response = app
            .oneshot(Request::post("/api/strategy/retry").body(Body::empty()).expect("request"))
            .await
            .expect("call");

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn generating_leads_when_gateway_is_down_is_service_unavailable() {
        let control = control();
        let fintech = SectorInsight {
            sector: "Fintech".to_string(),
            rationale: String::new(),
            target_roles: Vec::new(),
            value_proposition: String::new(),
            pain_points: Vec::new(),
            strategy_mix: None,
        };
        control
            .store()
            .dispatch(StoreAction::SectorApproved(fintech), "setup")
            .await
            .expect("approve");
        let app = router(control, 1024);

        let response = app
            .oneshot(Request::post("/api/leads/generate").body(Body::empty()).expect("request"))
            .await
            .expect("call");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn approving_without_analysis_is_rejected() {
        let result = approve_sector(
            State(ApiState { control: control() }),
            Json(ApproveSectorRequest { sector: "Fintech".to_string() }),
        )
        .await;

        let (status, Json(error)) = result.expect_err("no analysis yet");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.detail.contains("Analyze a document"));
    }

    #[tokio::test]
    async fn state_starts_idle_with_default_config() {
        let Json(state) = current_state(State(ApiState { control: control() })).await;

        assert_eq!(state.strategy_mode, StrategyMode::Idle);
        assert!(state.campaign_config.email_sequence);
        assert!(!state.campaign_config.outbound_voice);
    }
}
