use crate::config::PipelineConfig;
use crate::models::{
    EngagementRecord, RawRecord, FIELD_COLLABORATION, FIELD_ENGAGEMENT, FIELD_FEEDBACK,
    FIELD_ISSUES, FIELD_NAME, FIELD_PARTNERS, FIELD_RECOMMEND, FIELD_WEEK,
};

pub fn normalize_records(raw: &[RawRecord], config: &PipelineConfig) -> Vec<EngagementRecord> {
    let records: Vec<EngagementRecord> = raw
        .iter()
        .map(|record| normalize_record(record, config))
        .collect();
    tracing::debug!(count = records.len(), "normalized records");
    records
}

/// Total over any input shape: every missing or malformed field falls back
/// to its default instead of failing the record.
pub fn normalize_record(raw: &RawRecord, config: &PipelineConfig) -> EngagementRecord {
    let raw_name = raw.get(FIELD_NAME).unwrap_or_default().to_string();
    let partners = raw
        .get(FIELD_PARTNERS)
        .map(|value| split_partners(value, config))
        .unwrap_or_default();
    // An unanswered collaboration question is implied by naming a partner.
    let collaborated = match raw.get(FIELD_COLLABORATION) {
        Some(answer) => parse_flag(answer),
        None => !partners.is_empty(),
    };

    EngagementRecord {
        contributor: resolve_contributor(&raw_name, config),
        raw_name,
        week: raw.get(FIELD_WEEK).unwrap_or_default().to_string(),
        engagement_tier: raw.get(FIELD_ENGAGEMENT).map(engagement_tier).unwrap_or(0),
        collaborated,
        partners,
        issue_count: raw.get(FIELD_ISSUES).map(parse_count).unwrap_or(0),
        recommend_likelihood: raw.get(FIELD_RECOMMEND).and_then(parse_likelihood),
        feedback: raw.get(FIELD_FEEDBACK).map(str::to_string),
    }
}

/// Reads the tier from answers shaped like "3 - Highly engaged".
pub fn engagement_tier(text: &str) -> u8 {
    let text = text.trim();
    let mut chars = text.chars();
    let Some(tier) = chars.next().and_then(|c| c.to_digit(10)) else {
        return 0;
    };
    if !(1..=3).contains(&tier) || !chars.as_str().trim_start().starts_with('-') {
        return 0;
    }
    tier as u8
}

pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "yes" | "y" | "true" | "1"
    )
}

/// Leading non-negative integer of numeric-like text; anything else is 0.
pub fn parse_count(text: &str) -> u32 {
    leading_integer(text).unwrap_or(0)
}

fn parse_likelihood(text: &str) -> Option<u8> {
    leading_integer(text).map(|value| value.min(10) as u8)
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub fn split_partners(value: &str, config: &PipelineConfig) -> Vec<String> {
    let mut partners: Vec<String> = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let resolved = resolve_partner(part, config);
        if !partners.contains(&resolved) {
            partners.push(resolved);
        }
    }
    partners
}

pub fn resolve_partner(name: &str, config: &PipelineConfig) -> String {
    let name = name.trim();
    config
        .partner_aliases
        .get(&name.to_lowercase())
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// Alias table first, then the curated duplicate-name rules as the final say.
pub fn resolve_contributor(name: &str, config: &PipelineConfig) -> String {
    let name = name.trim();
    let aliased = config
        .contributor_aliases
        .get(&name.to_lowercase())
        .map(String::as_str)
        .unwrap_or(name);

    config
        .duplicate_rules
        .iter()
        .find(|rule| rule.name.trim().eq_ignore_ascii_case(aliased))
        .map(|rule| rule.canonical.clone())
        .unwrap_or_else(|| aliased.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .fold(RawRecord::new(), |record, (key, value)| record.with(key, value))
    }

    #[test]
    fn tiers_follow_leading_digit() {
        assert_eq!(engagement_tier("3 - Highly engaged"), 3);
        assert_eq!(engagement_tier("2 -"), 2);
        assert_eq!(engagement_tier(" 1 - Barely"), 1);
        assert_eq!(engagement_tier("4 - Off the charts"), 0);
        assert_eq!(engagement_tier("Highly engaged"), 0);
        assert_eq!(engagement_tier("3"), 0);
    }

    #[test]
    fn counts_default_to_zero() {
        assert_eq!(parse_count("4"), 4);
        assert_eq!(parse_count(" 5 issues"), 5);
        assert_eq!(parse_count("2.0"), 2);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count("many"), 0);
    }

    #[test]
    fn partners_split_trim_and_resolve() {
        let config = PipelineConfig::default();
        assert_eq!(
            split_partners(" ipfs, Libp2p ,, Drand, IPFS", &config),
            vec!["IPFS", "Libp2p", "Drand"]
        );
        assert_eq!(split_partners("Filecoin", &config), vec!["Filecoin"]);
    }

    #[test]
    fn contributor_aliases_then_duplicate_rules() {
        let config = PipelineConfig::default();
        assert_eq!(resolve_contributor(" MIKE ", &config), "Michael");
        assert_eq!(resolve_contributor("jonathon", &config), "Jonathan");
        assert_eq!(resolve_contributor("Jon", &config), "Jonathan");
        assert_eq!(resolve_contributor("Priya", &config), "Priya");
    }

    #[test]
    fn malformed_record_normalizes_to_defaults() {
        let config = PipelineConfig::default();
        let record = normalize_record(
            &raw(&[
                ("name", " mike "),
                ("issues_count", "lots"),
                ("recommend_likelihood", "n/a"),
                ("engagement_participation", "maybe"),
            ]),
            &config,
        );

        assert_eq!(record.raw_name, "mike");
        assert_eq!(record.contributor, "Michael");
        assert_eq!(record.week, "");
        assert_eq!(record.engagement_tier, 0);
        assert!(!record.collaborated);
        assert!(record.partners.is_empty());
        assert_eq!(record.issue_count, 0);
        assert_eq!(record.recommend_likelihood, None);
        assert_eq!(record.feedback, None);
    }

    #[test]
    fn complete_record_keeps_every_field() {
        let config = PipelineConfig::default();
        let record = normalize_record(
            &raw(&[
                ("Name", "Alice"),
                ("Week", "Week 3 (2024-01-20)"),
                ("Engagement Participation", "3 - Highly engaged"),
                ("Tech Partner Collaboration", "Yes"),
                ("Tech Partners", "IPFS, Libp2p"),
                ("Issues Count", "7"),
                ("Recommend Likelihood", "12"),
                ("Feedback", "Great mentors"),
            ]),
            &config,
        );

        assert_eq!(record.week, "Week 3 (2024-01-20)");
        assert_eq!(record.engagement_tier, 3);
        assert!(record.collaborated);
        assert_eq!(record.partners, vec!["IPFS", "Libp2p"]);
        assert_eq!(record.issue_count, 7);
        assert_eq!(record.recommend_likelihood, Some(10));
        assert_eq!(record.feedback.as_deref(), Some("Great mentors"));
    }

    #[test]
    fn collaboration_follows_explicit_answer_over_partner_list() {
        let config = PipelineConfig::default();
        let implied = normalize_record(&raw(&[("tech_partners", "IPFS")]), &config);
        assert!(implied.collaborated);

        let declined = normalize_record(
            &raw(&[("tech_partners", "IPFS"), ("tech_partner_collaboration", "No")]),
            &config,
        );
        assert!(!declined.collaborated);
        assert_eq!(declined.partners, vec!["IPFS"]);
    }
}
