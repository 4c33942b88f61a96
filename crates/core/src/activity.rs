use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Strategy,
    Leads,
    Scoring,
    Email,
    Call,
    Persistence,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOutcome {
    Success,
    Rejected,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub entry_id: String,
    pub correlation_id: String,
    pub event_type: String,
    pub category: ActivityCategory,
    pub outcome: ActivityOutcome,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        correlation_id: impl Into<String>,
        event_type: impl Into<String>,
        category: ActivityCategory,
        outcome: ActivityOutcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            correlation_id: correlation_id.into(),
            event_type: event_type.into(),
            category,
            outcome,
            message: message.into(),
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait ActivitySink {
    fn record(&mut self, entry: ActivityEntry);
}

/// Dashboard activity feed, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl ActivitySink for ActivityLog {
    fn record(&mut self, entry: ActivityEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use crate::activity::{
        ActivityCategory, ActivityEntry, ActivityLog, ActivityOutcome, ActivitySink,
    };

    #[test]
    fn log_records_entries_with_correlation_fields() {
        let mut log = ActivityLog::default();
        log.record(
            ActivityEntry::new(
                "req-123",
                "email.sent",
                ActivityCategory::Email,
                ActivityOutcome::Success,
                "sent step 1 to ada@example.com",
            )
            .with_metadata("lead_id", "LEAD-1"),
        );

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].correlation_id, "req-123");
        assert_eq!(log.entries()[0].metadata.get("lead_id").map(String::as_str), Some("LEAD-1"));

        log.clear();
        assert!(log.is_empty());
    }
}
