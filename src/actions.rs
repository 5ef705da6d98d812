use std::collections::BTreeSet;

use crate::config::PipelineConfig;
use crate::models::{ActionItem, ActionItemKind, EngagementRecord, EngagementTrendPoint, WeekBucket};

/// Minimum responses across onboarding weeks before onboarding counts as a win.
const NEW_CONTRIBUTOR_THRESHOLD: usize = 2;

/// Evaluates every rule independently; each one either adds its item or
/// stays silent.
pub fn synthesize_actions(
    records: &[EngagementRecord],
    buckets: &[WeekBucket<'_>],
    trends: &[EngagementTrendPoint],
    config: &PipelineConfig,
) -> Vec<ActionItem> {
    if records.is_empty() {
        return Vec::new();
    }

    let items: Vec<ActionItem> = [
        engagement_drop(trends),
        idle_partners(records, config),
        onboarding_momentum(buckets, config),
    ]
    .into_iter()
    .flatten()
    .collect();

    tracing::debug!(items = items.len(), "synthesized action items");
    items
}

fn engagement_drop(trends: &[EngagementTrendPoint]) -> Option<ActionItem> {
    let [.., previous, latest] = trends else {
        return None;
    };
    if latest.highly_engaged >= previous.highly_engaged {
        return None;
    }

    Some(ActionItem {
        kind: ActionItemKind::Warning,
        title: "Declining high engagement".to_string(),
        description: format!(
            "Highly engaged contributors dropped from {} in {} to {} in {}.",
            previous.highly_engaged, previous.week, latest.highly_engaged, latest.week
        ),
        action: "Review recent program changes and gather feedback from contributors."
            .to_string(),
    })
}

fn idle_partners(records: &[EngagementRecord], config: &PipelineConfig) -> Option<ActionItem> {
    let active: BTreeSet<&str> = records
        .iter()
        .filter(|record| record.collaborated)
        .flat_map(|record| record.partners.iter().map(String::as_str))
        .collect();

    let idle: BTreeSet<&str> = config
        .partners
        .iter()
        .map(|partner| partner.trim())
        .chain(
            records
                .iter()
                .flat_map(|record| record.partners.iter().map(String::as_str)),
        )
        .filter(|partner| !partner.is_empty() && !active.contains(partner))
        .collect();

    if idle.is_empty() {
        return None;
    }

    let names: Vec<&str> = idle.iter().copied().collect();
    Some(ActionItem {
        kind: ActionItemKind::Opportunity,
        title: "Partners without active contributors".to_string(),
        description: format!(
            "{} tech partner(s) have no collaborating contributors: {}.",
            idle.len(),
            names.join(", ")
        ),
        action: "Schedule check-ins with these partners to match them with contributors."
            .to_string(),
    })
}

fn onboarding_momentum(buckets: &[WeekBucket<'_>], config: &PipelineConfig) -> Option<ActionItem> {
    let onboarding: usize = buckets
        .iter()
        .filter(|bucket| config.new_contributor_weeks.contains(&bucket.order))
        .map(|bucket| bucket.records.len())
        .sum();

    if onboarding <= NEW_CONTRIBUTOR_THRESHOLD {
        return None;
    }

    Some(ActionItem {
        kind: ActionItemKind::Success,
        title: "Strong onboarding turnout".to_string(),
        description: format!("{onboarding} responses came in during the onboarding weeks."),
        action: "Pair new contributors with mentors to keep the momentum going.".to_string(),
    })
}
