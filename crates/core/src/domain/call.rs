use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Dialing,
    Connected,
    Completed,
    Voicemail,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Voicemail)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: CallId,
    pub lead_id: LeadId,
    pub status: CallStatus,
    pub duration_secs: u32,
    pub transcript: String,
    pub sentiment: Option<CallSentiment>,
    pub timestamp: DateTime<Utc>,
}

impl Call {
    pub fn dialing(id: CallId, lead_id: LeadId) -> Self {
        Self {
            id,
            lead_id,
            status: CallStatus::Dialing,
            duration_secs: 0,
            transcript: String::new(),
            sentiment: None,
            timestamp: Utc::now(),
        }
    }
}

/// Progress report for the active call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUpdate {
    pub call_id: CallId,
    pub status: CallStatus,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub sentiment: Option<CallSentiment>,
}
