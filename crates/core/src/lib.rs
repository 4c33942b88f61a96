pub mod activity;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod scoring;
pub mod store;
pub mod upload;

pub use activity::{ActivityCategory, ActivityEntry, ActivityLog, ActivityOutcome, ActivitySink};
pub use domain::analysis::{AnalysisId, AnalysisPayload, AnalysisResult, SectorInsight};
pub use domain::call::{Call, CallId, CallSentiment, CallStatus, CallUpdate};
pub use domain::campaign::{CampaignConfig, SuggestedConfig};
pub use domain::email::{EmailDraft, EmailDraftId, EmailStatus};
pub use domain::lead::{Lead, LeadId, LeadScore, LeadStatus, ScoreConfidence, ScoringCriteria};
pub use domain::strategy::{ActiveTab, Strategy};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{StrategyAction, StrategyEvent, StrategyFlow, StrategyMode, TransitionOutcome};
pub use store::{CampaignState, ReduceOutcome, StoreAction};
pub use upload::{DocumentKind, DocumentUpload, UploadPolicy, UploadRejection, ValidatedDocument};
