use serde::{Deserialize, Serialize};

/// Stage of the document analysis pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyMode {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    Complete,
    Error,
}

impl StrategyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Uploading => "UPLOADING",
            Self::Analyzing => "ANALYZING",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Analyzing)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyEvent {
    FileAccepted,
    RequestDispatched,
    AnalysisSucceeded,
    AnalysisFailed,
    AnalysisTimedOut,
    RetryRequested,
    CancelRequested,
    ResetRequested,
    AnalysisRestored,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyAction {
    StartTimeoutGuard,
    StoreActiveAnalysis,
    ApplySuggestedConfig,
    PersistActiveAnalysis,
    SurfaceError,
    ClearFileInput,
    ClearDerivedState,
    ClearPersistence,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: StrategyMode,
    pub to: StrategyMode,
    pub event: StrategyEvent,
    pub actions: Vec<StrategyAction>,
}
