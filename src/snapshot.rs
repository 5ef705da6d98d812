use crate::actions::synthesize_actions;
use crate::config::PipelineConfig;
use crate::metrics;
use crate::models::{EngagementRecord, Insights, ProcessedSnapshot, RawRecord};
use crate::normalize::normalize_records;
use crate::partners::aggregate_partners;
use crate::ranking::rank_contributors;
use crate::validation::{cross_validate, TrackerSummary};
use crate::weeks::index_weeks;

/// Runs the whole pipeline over one batch of raw records. Never fails: an
/// empty or malformed batch yields an all-default snapshot.
pub fn assemble_snapshot(
    raw: &[RawRecord],
    tracker: Option<&TrackerSummary>,
    config: &PipelineConfig,
) -> ProcessedSnapshot {
    let records = normalize_records(raw, config);
    build_snapshot(&records, tracker, config)
}

pub fn build_snapshot(
    records: &[EngagementRecord],
    tracker: Option<&TrackerSummary>,
    config: &PipelineConfig,
) -> ProcessedSnapshot {
    let buckets = index_weeks(records);

    let totals = metrics::totals(records, &buckets);
    let program_health = metrics::program_health(records);
    let engagement_trends = metrics::engagement_trends(&buckets);
    let technical_progress = metrics::technical_progress(&buckets);
    let tech_partners = aggregate_partners(&buckets);
    let top_performers = rank_contributors(records, config);
    let action_items = synthesize_actions(records, &buckets, &engagement_trends, config);
    let discrepancies = tracker
        .map(|tracker| cross_validate(records, tracker, config))
        .unwrap_or_default();

    tracing::debug!(
        responses = totals.total_responses,
        weeks = buckets.len(),
        actions = action_items.len(),
        "assembled snapshot"
    );

    ProcessedSnapshot {
        totals,
        program_health,
        engagement_trends,
        technical_progress,
        tech_partners,
        top_performers,
        action_items,
        feedback_sentiment: metrics::feedback_sentiment(records),
        discrepancies,
        insights: Insights::default(),
    }
}
