//! Orchestration layer for Mission Control.
//!
//! This crate drives the hosted AI and data APIs on behalf of the dashboard:
//! - Uploads strategy documents for analysis under a wall-clock guard
//! - Retrieves, scores and drafts outreach for leads (`pipeline`)
//! - Works through the email queue with a cooperative stop signal (`campaign`)
//! - Places outbound calls and tracks the active call
//!
//! # Architecture
//!
//! Every state change is a [`mission_core::store::StoreAction`] applied to a
//! shared [`store::CampaignStore`]. The strategy mode only moves through the
//! flow engine, so a reply that arrives after a timeout, cancel or reset
//! cannot resurrect a finished analysis.
//!
//! External APIs sit behind the traits in [`gateway`]. Production wiring uses
//! [`http::HttpGateway`]; document analysis can instead run through the LLM
//! failover chain in [`llm`].

pub mod analysis;
pub mod campaign;
pub mod cancel;
pub mod controller;
pub mod gateway;
pub mod http;
pub mod json;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod store;

#[cfg(test)]
mod fakes;

pub use campaign::{CampaignReport, CampaignRunner, DraftOutcome};
pub use cancel::CancellationToken;
pub use controller::{
    build_gateways, AnalysisOutcome, AnalysisTicket, ControllerSettings, MissionControl,
};
pub use gateway::{GatewayError, Gateways};
pub use pipeline::{LeadPipeline, LeadScoringOutcome, PipelineSettings, ScoreSource, ScoringHandle};
pub use store::CampaignStore;
