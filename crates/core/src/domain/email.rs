use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::LeadId;

pub const MAX_SEQUENCE_STEP: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailDraftId(pub String);

impl EmailDraftId {
    pub fn generate() -> Self {
        Self(format!("EML-{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Draft,
    Scheduled,
    Sent,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraft {
    pub id: EmailDraftId,
    pub lead_id: LeadId,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub sequence_step: u8,
}

impl EmailDraft {
    pub fn new(lead_id: LeadId, subject: String, body: String, sequence_step: u8) -> Self {
        Self {
            id: EmailDraftId::generate(),
            lead_id,
            subject,
            body,
            status: EmailStatus::Draft,
            sequence_step: sequence_step.clamp(1, MAX_SEQUENCE_STEP),
        }
    }

    /// Step of the follow-up this draft would schedule, if any.
    pub fn next_step(&self) -> Option<u8> {
        (self.sequence_step < MAX_SEQUENCE_STEP).then_some(self.sequence_step + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::{EmailDraft, MAX_SEQUENCE_STEP};
    use crate::domain::lead::LeadId;

    #[test]
    fn sequence_step_is_capped() {
        let first = EmailDraft::new(LeadId("L-1".to_string()), "s".into(), "b".into(), 1);
        let last = EmailDraft::new(LeadId("L-1".to_string()), "s".into(), "b".into(), 9);

        assert_eq!(first.next_step(), Some(2));
        assert_eq!(last.sequence_step, MAX_SEQUENCE_STEP);
        assert_eq!(last.next_step(), None);
    }
}
