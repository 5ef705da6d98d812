use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FIELD_NAME: &str = "name";
pub const FIELD_WEEK: &str = "week";
pub const FIELD_ENGAGEMENT: &str = "engagement_participation";
pub const FIELD_COLLABORATION: &str = "tech_partner_collaboration";
pub const FIELD_PARTNERS: &str = "tech_partners";
pub const FIELD_ISSUES: &str = "issues_count";
pub const FIELD_RECOMMEND: &str = "recommend_likelihood";
pub const FIELD_FEEDBACK: &str = "feedback";

pub const RECORD_FIELDS: [&str; 8] = [
    FIELD_NAME,
    FIELD_WEEK,
    FIELD_ENGAGEMENT,
    FIELD_COLLABORATION,
    FIELD_PARTNERS,
    FIELD_ISSUES,
    FIELD_RECOMMEND,
    FIELD_FEEDBACK,
];

/// One contributor's weekly answers exactly as acquired: a loose
/// string-keyed map where any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields.insert(canonical_field(key), value.to_string());
    }

    /// Blank values read the same as absent ones.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Maps spreadsheet headers onto the canonical field keys.
pub fn canonical_field(header: &str) -> String {
    let key = header
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let canonical = match key.as_str() {
        "contributor" | "contributor_name" | "full_name" | "your_name" => FIELD_NAME,
        "program_week" | "week_label" => FIELD_WEEK,
        "engagement" | "participation" => FIELD_ENGAGEMENT,
        "collaboration" | "partner_collaboration" => FIELD_COLLABORATION,
        "partner" | "partners" | "tech_partner" | "which_tech_partner" => FIELD_PARTNERS,
        "issues" | "issue_count" | "number_of_issues" => FIELD_ISSUES,
        "nps" | "recommend" => FIELD_RECOMMEND,
        "comments" | "additional_feedback" => FIELD_FEEDBACK,
        other if other.starts_with("how_likely") => FIELD_RECOMMEND,
        other if other.starts_with("how_engaged") => FIELD_ENGAGEMENT,
        other if other.starts_with("did_you_collaborate") => FIELD_COLLABORATION,
        other => return other.to_string(),
    };
    canonical.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementRecord {
    /// Trimmed name as submitted, before any alias resolution.
    pub raw_name: String,
    pub contributor: String,
    pub week: String,
    pub engagement_tier: u8,
    pub collaborated: bool,
    pub partners: Vec<String>,
    pub issue_count: u32,
    pub recommend_likelihood: Option<u8>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WeekBucket<'a> {
    pub label: String,
    pub order: u32,
    pub records: Vec<&'a EngagementRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_contributors: usize,
    pub total_contributions: u64,
    pub total_responses: usize,
    pub weekly_change: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramHealth {
    pub net_promoter_score: i32,
    pub engagement_rate: u32,
    pub active_tech_partners: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementTrendPoint {
    pub week: String,
    pub highly_engaged: usize,
    pub moderately_engaged: usize,
    pub low_engaged: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalProgressPoint {
    pub week: String,
    pub total_issues: u64,
    pub contributors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerWeekPoint {
    pub week: String,
    pub issue_count: u64,
    pub contributor_names: Vec<String>,
    pub engagement_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechPartnerMetric {
    pub partner: String,
    pub total_issues: u64,
    pub active_contributors: usize,
    pub time_series: Vec<PartnerWeekPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub name: String,
    pub total_issues: u64,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionItemKind {
    Warning,
    Success,
    Opportunity,
}

impl ActionItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Opportunity => "opportunity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub kind: ActionItemKind,
    pub title: String,
    pub description: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSentiment {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

/// Narrative block produced by the external summarizer. The default value
/// stands for "not enriched".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub trends: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub achievements: Vec<String>,
    pub engagement_score: u8,
    pub technical_progress_score: u8,
    pub collaboration_score: u8,
}

impl Insights {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub contributor: String,
    pub reported: u64,
    pub tracked: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSnapshot {
    pub totals: Totals,
    pub program_health: ProgramHealth,
    pub engagement_trends: Vec<EngagementTrendPoint>,
    pub technical_progress: Vec<TechnicalProgressPoint>,
    pub tech_partners: Vec<TechPartnerMetric>,
    pub top_performers: Vec<TopPerformer>,
    pub action_items: Vec<ActionItem>,
    pub feedback_sentiment: FeedbackSentiment,
    pub discrepancies: Vec<Discrepancy>,
    pub insights: Insights,
}

/// What the CLI hands to downstream consumers: the snapshot plus the
/// metadata of the run that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotExport<'a> {
    pub id: Uuid,
    pub cohort: Option<&'a str>,
    pub generated_at: DateTime<Utc>,
    pub snapshot: &'a ProcessedSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_map_onto_canonical_fields() {
        assert_eq!(canonical_field("  Contributor Name "), FIELD_NAME);
        assert_eq!(canonical_field("Program-Week"), FIELD_WEEK);
        assert_eq!(
            canonical_field("How likely are you to recommend the program?"),
            FIELD_RECOMMEND
        );
        assert_eq!(canonical_field("Mentor Notes"), "mentor_notes");
    }

    #[test]
    fn blank_values_read_as_absent() {
        let record = RawRecord::new().with("Name", "  ").with("week", " Week 2 ");
        assert_eq!(record.get(FIELD_NAME), None);
        assert_eq!(record.get(FIELD_WEEK), Some("Week 2"));
        assert_eq!(record.get(FIELD_FEEDBACK), None);
    }

    #[test]
    fn action_items_serialize_with_type_tag() {
        let item = ActionItem {
            kind: ActionItemKind::Opportunity,
            title: "t".to_string(),
            description: "d".to_string(),
            action: "a".to_string(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "opportunity");
        assert_eq!(value["action"], "a");
        assert_eq!(item.kind.as_str(), "opportunity");
    }
}
