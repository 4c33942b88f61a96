//! Orchestration controller. Turns dashboard actions into gateway calls and
//! store actions, and owns the analysis timeout guard and the campaign slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use mission_core::activity::{ActivityCategory, ActivityEntry, ActivityOutcome};
use mission_core::config::{AnalysisBackend, AppConfig};
use mission_core::domain::analysis::{AnalysisPayload, AnalysisResult};
use mission_core::domain::call::{Call, CallUpdate};
use mission_core::domain::campaign::CampaignConfig;
use mission_core::domain::lead::LeadId;
use mission_core::domain::strategy::{ActiveTab, Strategy};
use mission_core::errors::{ApplicationError, DomainError};
use mission_core::flows::StrategyAction;
use mission_core::store::{CampaignState, ReduceOutcome, StoreAction};
use mission_core::upload::{DocumentKind, DocumentUpload, UploadPolicy, ValidatedDocument};
use mission_db::{ActiveAnalysisStore, RepositoryError};

use crate::analysis::LlmAnalysisGateway;
use crate::campaign::{CampaignReport, CampaignRunner, DEFAULT_SEND_THROTTLE};
use crate::cancel::CancellationToken;
use crate::gateway::{AnalysisGateway, CallRequest, GatewayError, Gateways};
use crate::http::HttpGateway;
use crate::llm::FailoverChain;
use crate::pipeline::{LeadPipeline, PipelineSettings, ScoringHandle};
use crate::render::EmailRenderer;
use crate::store::CampaignStore;

pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(90);

const PDF_HINT: &str =
    "If the PDF cannot be read, convert the PDF to an image (PNG or JPG) and upload that instead.";
const RETRY_HINT: &str = "Try again or upload a different document.";

#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub analysis_timeout: Duration,
    pub upload_policy: UploadPolicy,
    pub pipeline: PipelineSettings,
    pub send_throttle: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            upload_policy: UploadPolicy::default(),
            pipeline: PipelineSettings::default(),
            send_throttle: DEFAULT_SEND_THROTTLE,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            analysis_timeout: Duration::from_secs(config.analysis.timeout_secs),
            upload_policy: UploadPolicy { max_bytes: config.analysis.max_upload_bytes },
            pipeline: PipelineSettings {
                scoring_fanout: config.pipeline.scoring_fanout,
                auto_draft_threshold: config.pipeline.auto_draft_threshold,
            },
            send_throttle: Duration::from_millis(config.pipeline.send_throttle_ms),
        }
    }
}

/// Hosted gateways for every route, with document analysis served either by
/// the hosted route or by the LLM failover chain.
pub fn build_gateways(config: &AppConfig) -> Result<Gateways, ApplicationError> {
    let http = Arc::new(
        HttpGateway::new(config.gateways.clone())
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?,
    );

    let analysis: Arc<dyn AnalysisGateway> = match config.analysis.backend {
        AnalysisBackend::Remote => http.clone(),
        AnalysisBackend::Llm => {
            let chain = FailoverChain::from_config(&config.llm, http.client())
                .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
            Arc::new(LlmAnalysisGateway::new(chain))
        }
    };

    Ok(Gateways {
        analysis,
        leads: http.clone(),
        scoring: http.clone(),
        drafts: http.clone(),
        email: http.clone(),
        calls: http,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed(AnalysisResult),
    Failed(String),
    TimedOut { seconds: u64 },
    /// Reset, cancel or a newer upload overtook this attempt.
    Superseded,
}

/// Returned by [`MissionControl::submit_document`] once the request is in
/// flight.
pub struct AnalysisTicket {
    pub attempt: u64,
    handle: JoinHandle<AnalysisOutcome>,
}

impl AnalysisTicket {
    pub async fn wait(self) -> AnalysisOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(error) => AnalysisOutcome::Failed(format!("analysis task stopped: {error}")),
        }
    }
}

struct ActiveCampaign {
    token: CancellationToken,
    handle: JoinHandle<CampaignReport>,
}

#[derive(Clone)]
pub struct MissionControl {
    store: CampaignStore,
    gateways: Gateways,
    persistence: Arc<dyn ActiveAnalysisStore>,
    settings: ControllerSettings,
    pipeline: LeadPipeline,
    runner: CampaignRunner,
    campaign: Arc<Mutex<Option<ActiveCampaign>>>,
    /// Held across a store transition and the persistence write that follows it.
    persistence_gate: Arc<Mutex<()>>,
}

impl MissionControl {
    pub fn new(
        gateways: Gateways,
        persistence: Arc<dyn ActiveAnalysisStore>,
        settings: ControllerSettings,
    ) -> Result<Self, ApplicationError> {
        let store = CampaignStore::default();
        let renderer = EmailRenderer::new()
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let pipeline = LeadPipeline::new(store.clone(), gateways.clone(), settings.pipeline);
        let runner = CampaignRunner::new(
            store.clone(),
            gateways.email.clone(),
            gateways.drafts.clone(),
            Arc::new(renderer),
            settings.send_throttle,
        );

        Ok(Self {
            store,
            gateways,
            persistence,
            settings,
            pipeline,
            runner,
            campaign: Arc::new(Mutex::new(None)),
            persistence_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn store(&self) -> &CampaignStore {
        &self.store
    }

    pub async fn state(&self) -> CampaignState {
        self.store.snapshot().await
    }

    /// Loads the persisted active analysis. Unreadable data is discarded.
    pub async fn restore(
        &self,
        correlation_id: &str,
    ) -> Result<Option<AnalysisResult>, ApplicationError> {
        match self.persistence.load_active_analysis().await {
            Ok(Some(result)) => {
                self.store
                    .dispatch(StoreAction::AnalysisRestored(result.clone()), correlation_id)
                    .await?;
                info!(
                    event_name = "strategy.analysis_restored",
                    correlation_id,
                    analysis_id = %result.id.0,
                    "restored active analysis"
                );
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(RepositoryError::Decode(message)) => {
                warn!(
                    event_name = "strategy.restore_discarded",
                    correlation_id,
                    error = %message,
                    "persisted analysis is unreadable; clearing it"
                );
                if let Err(error) = self.persistence.clear_active_analysis().await {
                    warn!(correlation_id, error = %error, "could not clear persisted analysis");
                }
                Ok(None)
            }
            Err(error) => Err(ApplicationError::Persistence(error.to_string())),
        }
    }

    /// Validates the upload and dispatches it for analysis. Invalid files are
    /// rejected before any transition or gateway call.
    pub async fn submit_document(
        &self,
        upload: DocumentUpload,
        correlation_id: &str,
    ) -> Result<AnalysisTicket, ApplicationError> {
        let document = self.settings.upload_policy.validate(upload).map_err(|rejection| {
            warn!(
                event_name = "strategy.upload_rejected",
                correlation_id,
                error = %rejection,
                "document rejected before upload"
            );
            DomainError::from(rejection)
        })?;

        self.store
            .dispatch(
                StoreAction::UploadStarted { file_name: document.file_name.clone() },
                correlation_id,
            )
            .await?;
        let attempt = self.store.read(|state| state.analysis_attempt).await;
        self.store.dispatch(StoreAction::AnalysisDispatched { attempt }, correlation_id).await?;
        info!(
            event_name = "strategy.analysis_dispatched",
            correlation_id,
            attempt,
            file_name = %document.file_name,
            kind = ?document.kind,
            "analysis request dispatched"
        );

        let controller = self.clone();
        let correlation_id = correlation_id.to_string();
        let handle = tokio::spawn(async move {
            controller.run_analysis(attempt, document, correlation_id).await
        });
        Ok(AnalysisTicket { attempt, handle })
    }

    async fn run_analysis(
        &self,
        attempt: u64,
        document: ValidatedDocument,
        correlation_id: String,
    ) -> AnalysisOutcome {
        let correlation_id = correlation_id.as_str();
        let file_name = document.file_name.clone();
        let kind = document.kind;
        let gateway = self.gateways.analysis.clone();
        let mut call = tokio::spawn(async move { gateway.analyze(&document).await });

        tokio::select! {
            joined = &mut call => {
                let result = joined.unwrap_or_else(|error| {
                    Err(GatewayError::Provider(format!("analysis task stopped: {error}")))
                });
                self.settle(attempt, &file_name, kind, result, correlation_id).await
            }
            _ = tokio::time::sleep(self.settings.analysis_timeout) => {
                let seconds = self.settings.analysis_timeout.as_secs();
                warn!(
                    event_name = "strategy.analysis_timed_out",
                    correlation_id,
                    attempt,
                    seconds,
                    "analysis exceeded its deadline"
                );
                let _ = self
                    .store
                    .dispatch(StoreAction::AnalysisTimedOut { attempt, seconds }, correlation_id)
                    .await;

                let controller = self.clone();
                let correlation_id = correlation_id.to_string();
                tokio::spawn(async move {
                    controller.discard_late_result(attempt, file_name, call, &correlation_id).await
                });
                AnalysisOutcome::TimedOut { seconds }
            }
        }
    }

    /// A reply that lands after the deadline still reaches the store, where
    /// the flow rejects it.
    async fn discard_late_result(
        &self,
        attempt: u64,
        file_name: String,
        call: JoinHandle<Result<AnalysisPayload, GatewayError>>,
        correlation_id: &str,
    ) {
        let Ok(Ok(payload)) = call.await else {
            return;
        };
        let result = AnalysisResult::from_payload(file_name, &payload);
        let late = self
            .store
            .dispatch(
                StoreAction::AnalysisSucceeded {
                    attempt,
                    result,
                    suggested: payload.suggested_config,
                },
                correlation_id,
            )
            .await;
        info!(
            event_name = "strategy.late_result_discarded",
            correlation_id,
            attempt,
            accepted = late.is_ok_and(|outcome| outcome.transition().is_some()),
            "analysis reply arrived after the deadline"
        );
    }

    async fn settle(
        &self,
        attempt: u64,
        file_name: &str,
        kind: DocumentKind,
        result: Result<AnalysisPayload, GatewayError>,
        correlation_id: &str,
    ) -> AnalysisOutcome {
        let result = result.and_then(|payload| match payload.validate() {
            Ok(()) => Ok(payload),
            Err(message) => Err(GatewayError::Parse { endpoint: "analysis".to_string(), message }),
        });

        match result {
            Ok(payload) => {
                let analysis = AnalysisResult::from_payload(file_name, &payload);
                // A reset cannot slip between the transition and the write.
                let _gate = self.persistence_gate.lock().await;
                let outcome = self
                    .store
                    .dispatch(
                        StoreAction::AnalysisSucceeded {
                            attempt,
                            result: analysis.clone(),
                            suggested: payload.suggested_config,
                        },
                        correlation_id,
                    )
                    .await;
                match outcome {
                    Ok(outcome) if outcome.requires(&StrategyAction::PersistActiveAnalysis) => {
                        self.persist(&analysis, correlation_id).await;
                        info!(
                            event_name = "strategy.analysis_completed",
                            correlation_id,
                            attempt,
                            sectors = analysis.sectors.len(),
                            "analysis completed"
                        );
                        AnalysisOutcome::Completed(analysis)
                    }
                    _ => AnalysisOutcome::Superseded,
                }
            }
            Err(error) => {
                let message = failure_message(kind, &error);
                warn!(
                    event_name = "strategy.analysis_failed",
                    correlation_id,
                    attempt,
                    error = %error,
                    "analysis gateway failed"
                );
                match self
                    .store
                    .dispatch(
                        StoreAction::AnalysisFailed { attempt, message: message.clone() },
                        correlation_id,
                    )
                    .await
                {
                    Ok(ReduceOutcome::Transitioned(_)) => AnalysisOutcome::Failed(message),
                    _ => AnalysisOutcome::Superseded,
                }
            }
        }
    }

    async fn persist(&self, analysis: &AnalysisResult, correlation_id: &str) {
        if let Err(error) = self.persistence.save_active_analysis(analysis).await {
            warn!(
                event_name = "strategy.persist_failed",
                correlation_id,
                error = %error,
                "could not persist active analysis"
            );
            self.store
                .record(ActivityEntry::new(
                    correlation_id,
                    "persistence.save_failed",
                    ActivityCategory::Persistence,
                    ActivityOutcome::Failed,
                    error.to_string(),
                ))
                .await;
        }
    }

    pub async fn retry(&self, correlation_id: &str) -> Result<(), ApplicationError> {
        self.store.dispatch(StoreAction::RetryRequested, correlation_id).await?;
        Ok(())
    }

    pub async fn cancel(&self, correlation_id: &str) -> Result<(), ApplicationError> {
        self.store.dispatch(StoreAction::CancelRequested, correlation_id).await?;
        Ok(())
    }

    /// Returns everything to IDLE from any mode, stopping a running campaign
    /// and clearing the persisted analysis.
    pub async fn reset(&self, correlation_id: &str) -> Result<(), ApplicationError> {
        if let Some(active) = self.campaign.lock().await.take() {
            active.token.cancel();
        }

        let _gate = self.persistence_gate.lock().await;
        let outcome = self.store.dispatch(StoreAction::ResetRequested, correlation_id).await?;
        if outcome.requires(&StrategyAction::ClearPersistence) {
            self.persistence
                .clear_active_analysis()
                .await
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        }
        info!(event_name = "strategy.reset", correlation_id, "campaign state reset");
        Ok(())
    }

    pub async fn approve_sector(
        &self,
        sector_name: &str,
        correlation_id: &str,
    ) -> Result<Strategy, ApplicationError> {
        let sector = self
            .store
            .read(|state| {
                state.active_analysis.as_ref().map(|analysis| analysis.sector(sector_name).cloned())
            })
            .await;
        let sector = match sector {
            None => {
                return Err(DomainError::InvariantViolation(
                    "Analyze a document before approving a sector".to_string(),
                )
                .into())
            }
            Some(None) => {
                return Err(DomainError::InvariantViolation(format!(
                    "Sector `{sector_name}` is not part of the active analysis"
                ))
                .into())
            }
            Some(Some(sector)) => sector,
        };

        self.store.dispatch(StoreAction::SectorApproved(sector.clone()), correlation_id).await?;
        Ok(Strategy::from_sector(&sector))
    }

    pub async fn generate_leads(
        &self,
        correlation_id: &str,
    ) -> Result<ScoringHandle, ApplicationError> {
        self.pipeline.generate(correlation_id).await
    }

    /// Starts the email queue runner in the background. Only one campaign
    /// runs at a time.
    pub async fn start_campaign(
        &self,
        correlation_id: &str,
    ) -> Result<CancellationToken, ApplicationError> {
        let mut slot = self.campaign.lock().await;
        if slot.as_ref().is_some_and(|active| !active.handle.is_finished()) {
            return Err(DomainError::InvariantViolation(
                "A campaign is already running".to_string(),
            )
            .into());
        }

        let token = CancellationToken::new();
        let runner = self.runner.clone();
        let run_token = token.clone();
        let correlation_id = correlation_id.to_string();
        let handle = tokio::spawn(async move { runner.run(run_token, &correlation_id).await });
        *slot = Some(ActiveCampaign { token: token.clone(), handle });
        Ok(token)
    }

    /// Returns false when no campaign is running.
    pub async fn stop_campaign(&self, correlation_id: &str) -> bool {
        let slot = self.campaign.lock().await;
        match slot.as_ref() {
            Some(active) if !active.handle.is_finished() => {
                active.token.cancel();
                info!(event_name = "campaign.stop_requested", correlation_id, "stopping campaign");
                true
            }
            _ => false,
        }
    }

    /// Waits for the most recent campaign and returns its report.
    pub async fn wait_campaign(&self) -> Option<CampaignReport> {
        let active = self.campaign.lock().await.take()?;
        active.handle.await.ok()
    }

    pub async fn trigger_call(
        &self,
        lead_id: &LeadId,
        correlation_id: &str,
    ) -> Result<Call, ApplicationError> {
        let request = self
            .store
            .read(|state| {
                state.lead(lead_id).map(|lead| {
                    let rationale = state
                        .strategy
                        .as_ref()
                        .and_then(|strategy| strategy.rationale.clone())
                        .unwrap_or_default();
                    (lead.phone.clone(), lead.name.clone(), rationale)
                })
            })
            .await;
        let Some((phone, name, rationale)) = request else {
            return Err(DomainError::InvariantViolation(format!(
                "Lead `{}` is not in the lead list",
                lead_id.0
            ))
            .into());
        };
        let Some(phone) = phone.filter(|phone| !phone.trim().is_empty()) else {
            return Err(DomainError::InvariantViolation(format!(
                "Lead `{}` has no phone number",
                lead_id.0
            ))
            .into());
        };

        let request = CallRequest { lead_id: lead_id.clone(), phone, name, rationale };
        let call_id = match self.gateways.calls.trigger(&request).await {
            Ok(call_id) => call_id,
            Err(error) => {
                warn!(
                    event_name = "call.trigger_failed",
                    correlation_id,
                    lead_id = %lead_id.0,
                    error = %error,
                    "call gateway failed"
                );
                self.store
                    .record(
                        ActivityEntry::new(
                            correlation_id,
                            "call.trigger_failed",
                            ActivityCategory::Call,
                            ActivityOutcome::Failed,
                            error.to_string(),
                        )
                        .with_metadata("lead_id", lead_id.0.clone()),
                    )
                    .await;
                return Err(ApplicationError::Integration(error.to_string()));
            }
        };

        let call = Call::dialing(call_id, lead_id.clone());
        self.store.dispatch(StoreAction::CallStarted(call.clone()), correlation_id).await?;
        self.store
            .record(
                ActivityEntry::new(
                    correlation_id,
                    "call.started",
                    ActivityCategory::Call,
                    ActivityOutcome::Success,
                    format!("Dialing {}", request.name),
                )
                .with_metadata("lead_id", lead_id.0.clone())
                .with_metadata("call_id", call.id.0.clone()),
            )
            .await;
        Ok(call)
    }

    pub async fn record_call_update(
        &self,
        update: CallUpdate,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        self.store.dispatch(StoreAction::CallUpdated(update), correlation_id).await?;
        Ok(())
    }

    pub async fn update_config(
        &self,
        config: CampaignConfig,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        self.store.dispatch(StoreAction::ConfigUpdated(config), correlation_id).await?;
        Ok(())
    }

    pub async fn select_tab(
        &self,
        tab: ActiveTab,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        self.store.dispatch(StoreAction::TabSelected(tab), correlation_id).await?;
        Ok(())
    }
}

fn failure_message(kind: DocumentKind, error: &GatewayError) -> String {
    let detail = match error {
        GatewayError::Rejected { message, .. } => message.clone(),
        other => other.to_string(),
    };
    let hint = if kind == DocumentKind::Pdf { PDF_HINT } else { RETRY_HINT };
    format!("Analysis failed: {detail}. {hint}")
}
