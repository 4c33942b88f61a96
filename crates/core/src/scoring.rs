//! Local fit heuristic used when the scoring gateway is unavailable.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::lead::{Lead, LeadScore, ScoreConfidence, ScoringCriteria};

const BASE_SCORE: u32 = 50;
const EXACT_TITLE_BONUS: u32 = 25;
const SENIOR_TITLE_BONUS: u32 = 15;
const SECTOR_MATCH_BONUS: u32 = 15;
const COMPANY_SIZE_BONUS: u32 = 10;
const MAX_SCORE: u32 = 100;

/// Score at or above which a lead gets an automatic email draft.
pub const AUTO_DRAFT_THRESHOLD: u8 = 80;

fn senior_title_regex() -> &'static Regex {
    static SENIOR_TITLE_RE: OnceLock<Regex> = OnceLock::new();
    SENIOR_TITLE_RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(vp|svp|evp|vice president|director|head|chief|",
            r"c[etofmr]o|founder|president|partner)\b",
        ))
        .expect("senior title regex should compile")
    })
}

pub fn fallback_score(lead: &Lead, criteria: &ScoringCriteria) -> LeadScore {
    let mut score = BASE_SCORE;
    let mut key_factors = Vec::new();
    let title = lead.title.as_deref().map(str::trim).unwrap_or_default();

    if let Some(target_role) = criteria.target_role.as_deref().map(str::trim) {
        if !target_role.is_empty() && title.eq_ignore_ascii_case(target_role) {
            score += EXACT_TITLE_BONUS;
            key_factors.push(format!("title matches target role `{target_role}`"));
        }
    }

    if !title.is_empty() && senior_title_regex().is_match(title) {
        score += SENIOR_TITLE_BONUS;
        key_factors.push("senior decision-maker title".to_string());
    }

    if let Some(sector) = criteria.sector.as_deref().map(|value| value.trim().to_lowercase()) {
        let haystack = format!(
            "{} {}",
            lead.industry.as_deref().unwrap_or_default(),
            lead.company
        )
        .to_lowercase();
        if !sector.is_empty() && haystack.contains(&sector) {
            score += SECTOR_MATCH_BONUS;
            key_factors.push(format!("operates in `{sector}`"));
        }
    }

    if let Some(employees) = lead.employee_count {
        if employees > 50 && employees < 1_000 {
            score += COMPANY_SIZE_BONUS;
            key_factors.push(format!("{employees} employees is in the mid-market band"));
        }
    }

    let score = score.min(MAX_SCORE) as u8;
    LeadScore {
        score,
        reasoning: format!("heuristic fit score ({} signals matched)", key_factors.len()),
        confidence: ScoreConfidence::Low,
        key_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_score;
    use crate::domain::lead::{Lead, LeadId, LeadStatus, ScoreConfidence, ScoringCriteria};

    fn lead(title: Option<&str>, industry: Option<&str>, employees: Option<u32>) -> Lead {
        Lead {
            id: LeadId("LEAD-1".to_string()),
            name: "Ada Lovelace".to_string(),
            company: "Analytical Engines".to_string(),
            email: "ada@example.com".to_string(),
            score: 0,
            status: LeadStatus::New,
            title: title.map(str::to_string),
            industry: industry.map(str::to_string),
            employee_count: employees,
            phone: None,
        }
    }

    fn criteria() -> ScoringCriteria {
        ScoringCriteria {
            target_role: Some("VP Sales".to_string()),
            sector: Some("Fintech".to_string()),
            pain_points: Vec::new(),
        }
    }

    #[test]
    fn bare_lead_gets_base_score() {
        let score = fallback_score(&lead(None, None, None), &criteria());
        assert_eq!(score.score, 50);
        assert_eq!(score.confidence, ScoreConfidence::Low);
        assert!(score.key_factors.is_empty());
    }

    #[test]
    fn every_signal_is_capped_at_one_hundred() {
        let score =
            fallback_score(&lead(Some("vp sales"), Some("Fintech SaaS"), Some(200)), &criteria());
        assert_eq!(score.score, 100);
        assert_eq!(score.key_factors.len(), 4);
    }

    #[test]
    fn individual_signals_add_expected_points() {
        let director = lead(Some("Director of IT"), None, None);
        assert_eq!(fallback_score(&director, &criteria()).score, 65);
        assert_eq!(fallback_score(&lead(None, Some("fintech"), None), &criteria()).score, 65);
        assert_eq!(fallback_score(&lead(None, None, Some(500)), &criteria()).score, 60);
        assert_eq!(fallback_score(&lead(Some("Engineer"), None, None), &criteria()).score, 50);
    }

    #[test]
    fn employee_band_bounds_are_exclusive() {
        assert_eq!(fallback_score(&lead(None, None, Some(50)), &criteria()).score, 50);
        assert_eq!(fallback_score(&lead(None, None, Some(1_000)), &criteria()).score, 50);
        assert_eq!(fallback_score(&lead(None, None, Some(51)), &criteria()).score, 60);
    }

    #[test]
    fn score_is_deterministic_and_bounded() {
        let titles = [None, Some("CEO"), Some("VP Sales"), Some("intern"), Some("Head of Growth")];
        let industries = [None, Some("Fintech"), Some("Retail")];
        let sizes = [None, Some(10), Some(300), Some(5_000)];

        for title in titles {
            for industry in industries {
                for size in sizes {
                    let candidate = lead(title, industry, size);
                    let first = fallback_score(&candidate, &criteria());
                    let second = fallback_score(&candidate, &criteria());
                    assert_eq!(first, second);
                    assert!((50..=100).contains(&first.score));
                }
            }
        }
    }
}
