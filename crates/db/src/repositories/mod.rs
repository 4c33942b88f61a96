use async_trait::async_trait;
use thiserror::Error;

use mission_core::domain::analysis::AnalysisResult;

pub mod local_state;
pub mod memory;

pub use local_state::SqlLocalStateRepository;
pub use memory::InMemoryLocalStateRepository;

/// Key under which the active analysis is mirrored.
pub const ACTIVE_ANALYSIS_KEY: &str = "mission.active_analysis";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Device-local key/value storage holding JSON documents.
#[async_trait]
pub trait LocalStateRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;
    async fn put(&self, key: &str, value_json: String) -> Result<(), RepositoryError>;
    async fn delete(&self, key: &str) -> Result<(), RepositoryError>;
}

/// Typed access to the persisted active analysis.
#[async_trait]
pub trait ActiveAnalysisStore: Send + Sync {
    async fn load_active_analysis(&self) -> Result<Option<AnalysisResult>, RepositoryError>;
    async fn save_active_analysis(&self, analysis: &AnalysisResult) -> Result<(), RepositoryError>;
    async fn clear_active_analysis(&self) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T> ActiveAnalysisStore for T
where
    T: LocalStateRepository + ?Sized,
{
    async fn load_active_analysis(&self) -> Result<Option<AnalysisResult>, RepositoryError> {
        let Some(raw) = self.get(ACTIVE_ANALYSIS_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|error| {
            RepositoryError::Decode(format!("stored active analysis is unreadable: {error}"))
        })
    }

    async fn save_active_analysis(&self, analysis: &AnalysisResult) -> Result<(), RepositoryError> {
        let value_json = serde_json::to_string(analysis)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        self.put(ACTIVE_ANALYSIS_KEY, value_json).await
    }

    async fn clear_active_analysis(&self) -> Result<(), RepositoryError> {
        self.delete(ACTIVE_ANALYSIS_KEY).await
    }
}
