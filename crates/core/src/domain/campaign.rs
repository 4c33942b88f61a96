use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignConfig {
    pub email_sequence: bool,
    pub outbound_voice: bool,
    pub inbound_receptionist: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self { email_sequence: true, outbound_voice: false, inbound_receptionist: false }
    }
}

/// Partial config proposed by an analysis. Missing fields keep their
/// current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedConfig {
    #[serde(default)]
    pub email_sequence: Option<bool>,
    #[serde(default)]
    pub outbound_voice: Option<bool>,
    #[serde(default)]
    pub inbound_receptionist: Option<bool>,
}

impl CampaignConfig {
    pub fn apply_suggestion(&mut self, suggestion: &SuggestedConfig) {
        if let Some(email_sequence) = suggestion.email_sequence {
            self.email_sequence = email_sequence;
        }
        if let Some(outbound_voice) = suggestion.outbound_voice {
            self.outbound_voice = outbound_voice;
        }
        if let Some(inbound_receptionist) = suggestion.inbound_receptionist {
            self.inbound_receptionist = inbound_receptionist;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CampaignConfig, SuggestedConfig};

    #[test]
    fn partial_suggestion_keeps_unspecified_fields() {
        let mut config = CampaignConfig::default();
        config.apply_suggestion(&SuggestedConfig {
            outbound_voice: Some(true),
            ..SuggestedConfig::default()
        });

        assert!(config.email_sequence);
        assert!(config.outbound_voice);
        assert!(!config.inbound_receptionist);
    }
}
