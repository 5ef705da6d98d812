//! Cross-checks self-reported issue counts against issue-tracker data.
//! Mismatches are reported for review and never block a snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::config::PipelineConfig;
use crate::models::{Discrepancy, EngagementRecord};
use crate::normalize::resolve_contributor;
use crate::weeks::week_order;

const IGNORED_STATUSES: [&str; 2] = ["duplicate", "invalid"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerSummary {
    #[serde(default)]
    pub issues: Vec<TrackerIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerIssue {
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Program week the issue belongs to, as a "Week N" label.
    #[serde(default)]
    pub week: Option<String>,
}

impl TrackerIssue {
    /// Issues tagged with a week nobody answered the survey for fall outside
    /// the compared window. Untagged or unparseable weeks always count.
    fn in_window(&self, surveyed: &BTreeSet<u32>) -> bool {
        match self.week.as_deref().map(week_order) {
            Some(order) if order > 0 => surveyed.contains(&order),
            _ => true,
        }
    }
}

impl TrackerSummary {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tracker export {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse tracker export {}", path.display()))
    }
}

pub fn cross_validate(
    records: &[EngagementRecord],
    tracker: &TrackerSummary,
    config: &PipelineConfig,
) -> Vec<Discrepancy> {
    let mut reported: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records.iter().filter(|record| !record.contributor.is_empty()) {
        *reported.entry(record.contributor.as_str()).or_default() += u64::from(record.issue_count);
    }

    let surveyed: BTreeSet<u32> = records
        .iter()
        .map(|record| week_order(&record.week))
        .filter(|order| *order > 0)
        .collect();

    let mut tracked: BTreeMap<String, u64> = BTreeMap::new();
    for issue in tracker.issues.iter().filter(|issue| issue.in_window(&surveyed)) {
        let status = issue.status.trim().to_lowercase();
        if IGNORED_STATUSES.contains(&status.as_str()) {
            continue;
        }
        let Some(assignee) = issue.assignee.as_deref().map(str::trim) else {
            continue;
        };
        if assignee.is_empty() {
            continue;
        }
        *tracked.entry(resolve_contributor(assignee, config)).or_default() += 1;
    }

    let mut names: Vec<&str> = reported.keys().copied().collect();
    names.extend(tracked.keys().map(String::as_str));
    names.sort_unstable();
    names.dedup();

    let mut discrepancies: Vec<Discrepancy> = names
        .into_iter()
        .filter_map(|name| {
            let reported = reported.get(name).copied().unwrap_or(0);
            let tracked = tracked.get(name).copied().unwrap_or(0);
            (reported.abs_diff(tracked) > config.discrepancy_tolerance).then(|| Discrepancy {
                contributor: name.to_string(),
                reported,
                tracked,
            })
        })
        .collect();

    discrepancies.sort_by(|a, b| {
        b.reported
            .abs_diff(b.tracked)
            .cmp(&a.reported.abs_diff(a.tracked))
            .then_with(|| a.contributor.cmp(&b.contributor))
    });
    if !discrepancies.is_empty() {
        tracing::info!(count = discrepancies.len(), "self-reported counts disagree with tracker");
    }
    discrepancies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, issues: u32) -> EngagementRecord {
        EngagementRecord {
            raw_name: name.to_string(),
            contributor: name.to_string(),
            week: "Week 1".to_string(),
            engagement_tier: 2,
            collaborated: false,
            partners: Vec::new(),
            issue_count: issues,
            recommend_likelihood: None,
            feedback: None,
        }
    }

    fn issue(assignee: Option<&str>, status: &str) -> TrackerIssue {
        TrackerIssue {
            assignee: assignee.map(str::to_string),
            status: status.to_string(),
            week: None,
        }
    }

    #[test]
    fn matching_counts_produce_no_entries() {
        let records = vec![record("Michael", 2)];
        let tracker = TrackerSummary {
            issues: vec![issue(Some("mike"), "closed"), issue(Some("Michael"), "open")],
        };
        assert!(cross_validate(&records, &tracker, &PipelineConfig::default()).is_empty());
    }

    #[test]
    fn mismatches_sorted_by_gap() {
        let records = vec![record("Avery", 5), record("Kiara", 1)];
        let tracker = TrackerSummary {
            issues: vec![
                issue(Some("Avery"), "closed"),
                issue(Some("Kiara"), "open"),
                issue(Some("Kiara"), "duplicate"),
                issue(Some("Jules"), "open"),
                issue(None, "open"),
            ],
        };

        let found = cross_validate(&records, &tracker, &PipelineConfig::default());
        assert_eq!(
            found,
            vec![
                Discrepancy {
                    contributor: "Avery".to_string(),
                    reported: 5,
                    tracked: 1
                },
                Discrepancy {
                    contributor: "Jules".to_string(),
                    reported: 0,
                    tracked: 1
                },
            ]
        );
    }

    #[test]
    fn tolerance_absorbs_small_gaps() {
        let config = PipelineConfig {
            discrepancy_tolerance: 1,
            ..PipelineConfig::default()
        };
        let records = vec![record("Avery", 2)];
        let tracker = TrackerSummary {
            issues: vec![issue(Some("Avery"), "open")],
        };
        assert!(cross_validate(&records, &tracker, &config).is_empty());
    }

    #[test]
    fn issues_from_unsurveyed_weeks_are_skipped() {
        let records = vec![record("Avery", 1)];
        let mut later = issue(Some("Avery"), "open");
        later.week = Some("Week 4".to_string());
        let mut same = issue(Some("Avery"), "closed");
        same.week = Some("Week 1 (2026-01-05)".to_string());
        let mut unlabelled = issue(Some("Avery"), "open");
        unlabelled.week = Some("backlog".to_string());

        let tracker = TrackerSummary {
            issues: vec![later, same, unlabelled],
        };
        let found = cross_validate(&records, &tracker, &PipelineConfig::default());
        assert_eq!(
            found,
            vec![Discrepancy {
                contributor: "Avery".to_string(),
                reported: 1,
                tracked: 2
            }]
        );
    }

    #[test]
    fn tracker_export_parses_with_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"issues": [
                {"assignee": "Avery", "status": "open", "week": "Week 2"},
                {"status": "closed"}
            ]}"#,
        )
        .unwrap();
        let tracker = TrackerSummary::from_json_file(file.path()).unwrap();
        assert_eq!(tracker.issues.len(), 2);
        assert_eq!(tracker.issues[0].week.as_deref(), Some("Week 2"));
        assert_eq!(tracker.issues[1].assignee, None);
        assert_eq!(tracker.issues[1].week, None);
    }
}
