use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::{PipelineConfig, DEFAULT_TOP_PERFORMER_LIMIT};
use crate::models::{EngagementRecord, TopPerformer};
use crate::normalize::resolve_contributor;

#[derive(Debug, Default)]
struct NameGroup {
    total_issues: u64,
    tier_sum: u64,
    responses: usize,
}

impl NameGroup {
    fn avg_engagement(&self) -> f64 {
        if self.responses == 0 {
            0.0
        } else {
            self.tier_sum as f64 / self.responses as f64
        }
    }
}

/// Ranks contributors by issue count, then by average engagement tier.
///
/// Records are grouped by submitted name first; groups that resolve to the
/// same identity are then merged. A merged average is the plain mean of the
/// group averages, not a mean over every underlying record.
pub fn rank_contributors(
    records: &[EngagementRecord],
    config: &PipelineConfig,
) -> Vec<TopPerformer> {
    let mut by_name: BTreeMap<&str, NameGroup> = BTreeMap::new();

    for record in records {
        if record.raw_name.is_empty() {
            continue;
        }
        let entry = by_name.entry(record.raw_name.as_str()).or_default();
        entry.total_issues += u64::from(record.issue_count);
        entry.tier_sum += u64::from(record.engagement_tier);
        entry.responses += 1;
    }

    let mut merged: BTreeMap<String, (u64, Vec<f64>)> = BTreeMap::new();
    for (raw_name, group) in &by_name {
        let entry = merged
            .entry(resolve_contributor(raw_name, config))
            .or_insert_with(|| (0, Vec::new()));
        entry.0 += group.total_issues;
        entry.1.push(group.avg_engagement());
    }

    let mut performers: Vec<TopPerformer> = merged
        .into_iter()
        .map(|(name, (total_issues, averages))| TopPerformer {
            name,
            total_issues,
            avg_engagement: averages.iter().sum::<f64>() / averages.len() as f64,
        })
        .collect();

    performers.sort_by(compare_performers);
    performers.truncate(config.top_performer_limit.min(DEFAULT_TOP_PERFORMER_LIMIT));
    tracing::debug!(
        groups = by_name.len(),
        ranked = performers.len(),
        "ranked contributors"
    );
    performers
}

fn compare_performers(a: &TopPerformer, b: &TopPerformer) -> Ordering {
    b.total_issues
        .cmp(&a.total_issues)
        .then_with(|| {
            b.avg_engagement
                .partial_cmp(&a.avg_engagement)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.name.cmp(&b.name))
}
