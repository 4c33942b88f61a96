use serde::{Deserialize, Serialize};

use crate::domain::analysis::SectorInsight;

pub const DEFAULT_GEO: &str = "Global";
pub const DEFAULT_COMPANY_SIZE: &str = "Mid-Market";

/// Targeting configuration driving lead retrieval. Single slot: approving a
/// new sector replaces whatever was there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub industry: String,
    pub geo: String,
    pub company_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Strategy {
    pub fn from_sector(sector: &SectorInsight) -> Self {
        Self {
            industry: sector.sector.clone(),
            geo: DEFAULT_GEO.to_string(),
            company_size: DEFAULT_COMPANY_SIZE.to_string(),
            target_role: sector.target_roles.first().cloned(),
            domain: None,
            rationale: Some(sector.rationale.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActiveTab {
    #[default]
    Strategy,
    LeadGen,
    Campaign,
    Calls,
}
