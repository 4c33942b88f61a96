use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::campaign::SuggestedConfig;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(pub String);

impl AnalysisId {
    pub fn generate() -> Self {
        Self(format!("ANL-{}", Uuid::new_v4().simple()))
    }
}

/// One candidate market segment proposed by document analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorInsight {
    pub sector: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub value_proposition: String,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_mix: Option<String>,
}

/// Body returned by the analysis gateway before it is stamped with an id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sectors: Vec<SectorInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_config: Option<SuggestedConfig>,
}

impl AnalysisPayload {
    /// A payload is only usable when it names at least one sector.
    pub fn validate(&self) -> Result<(), String> {
        if self.sectors.is_empty() {
            return Err("analysis returned no sectors".to_string());
        }
        if self.sectors.iter().any(|sector| sector.sector.trim().is_empty()) {
            return Err("analysis returned a sector without a name".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: AnalysisId,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    pub sectors: Vec<SectorInsight>,
}

impl AnalysisResult {
    pub fn from_payload(file_name: impl Into<String>, payload: &AnalysisPayload) -> Self {
        Self {
            id: AnalysisId::generate(),
            file_name: file_name.into(),
            timestamp: Utc::now(),
            summary: payload.summary.clone(),
            sectors: payload.sectors.clone(),
        }
    }

    /// Case-insensitive lookup by sector name.
    pub fn sector(&self, name: &str) -> Option<&SectorInsight> {
        let wanted = name.trim();
        self.sectors.iter().find(|sector| sector.sector.trim().eq_ignore_ascii_case(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisPayload, AnalysisResult};

    #[test]
    fn payload_tolerates_missing_optional_fields() {
        let payload: AnalysisPayload = serde_json::from_str(
            r#"{"summary":"B2B payments",
                "sectors":[{"sector":"Fintech","targetRoles":["VP Sales"]}]}"#,
        )
        .expect("payload should parse");

        assert_eq!(payload.sectors.len(), 1);
        assert!(payload.sectors[0].pain_points.is_empty());
        assert!(payload.suggested_config.is_none());
    }

    #[test]
    fn sector_lookup_ignores_case_and_whitespace() {
        let payload: AnalysisPayload = serde_json::from_str(
            r#"{"summary":"s","sectors":[{"sector":"Fintech"},{"sector":"Healthcare"}]}"#,
        )
        .expect("payload should parse");
        let result = AnalysisResult::from_payload("prd.pdf", &payload);

        assert_eq!(result.sector(" fintech ").map(|s| s.sector.as_str()), Some("Fintech"));
        assert!(result.sector("Retail").is_none());
        assert!(result.id.0.starts_with("ANL-"));
    }

    #[test]
    fn payload_without_sectors_is_not_usable() {
        let error_body: AnalysisPayload =
            serde_json::from_str(r#"{"error":"quota exceeded"}"#).expect("object parses");
        let unnamed: AnalysisPayload =
            serde_json::from_str(r#"{"summary":"s","sectors":[{"sector":"  "}]}"#)
                .expect("object parses");
        let usable: AnalysisPayload =
            serde_json::from_str(r#"{"sectors":[{"sector":"Fintech"}]}"#).expect("parses");

        assert_eq!(error_body.validate(), Err("analysis returned no sectors".to_string()));
        assert!(unnamed.validate().is_err());
        assert_eq!(usable.validate(), Ok(()));
    }
}
