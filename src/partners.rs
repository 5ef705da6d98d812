use std::collections::{BTreeMap, BTreeSet};

use crate::metrics::engagement_rate;
use crate::models::{EngagementRecord, PartnerWeekPoint, TechPartnerMetric, WeekBucket};
use crate::weeks::display_label;

/// Per-partner issue totals, active contributors and weekly series.
///
/// Works from the week buckets, so a partner's total always equals the sum
/// of its series. A record naming two partners counts once toward each.
pub fn aggregate_partners(buckets: &[WeekBucket<'_>]) -> Vec<TechPartnerMetric> {
    let mut by_partner: BTreeMap<&str, TechPartnerMetric> = BTreeMap::new();
    let mut contributors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for bucket in buckets {
        let mut slices: BTreeMap<&str, Vec<&EngagementRecord>> = BTreeMap::new();
        for &record in &bucket.records {
            for partner in &record.partners {
                slices.entry(partner.as_str()).or_default().push(record);
            }
        }

        for (partner, records) in slices {
            let point = partner_week_point(&bucket.label, &records);
            let entry = by_partner.entry(partner).or_insert_with(|| TechPartnerMetric {
                partner: partner.to_string(),
                total_issues: 0,
                active_contributors: 0,
                time_series: Vec::new(),
            });
            entry.total_issues += point.issue_count;
            entry.time_series.push(point);

            contributors.entry(partner).or_default().extend(
                records
                    .iter()
                    .copied()
                    .map(|record| record.contributor.as_str())
                    .filter(|name| !name.is_empty()),
            );
        }
    }

    let mut metrics: Vec<TechPartnerMetric> = by_partner
        .into_iter()
        .map(|(partner, mut metric)| {
            metric.active_contributors = contributors.get(partner).map_or(0, BTreeSet::len);
            metric
        })
        .collect();

    metrics.sort_by(|a, b| {
        b.total_issues
            .cmp(&a.total_issues)
            .then_with(|| a.partner.cmp(&b.partner))
    });
    tracing::debug!(partners = metrics.len(), "aggregated tech partners");
    metrics
}

fn partner_week_point(label: &str, records: &[&EngagementRecord]) -> PartnerWeekPoint {
    let mut contributor_names: Vec<String> = Vec::new();
    for record in records {
        if !record.contributor.is_empty() && !contributor_names.contains(&record.contributor) {
            contributor_names.push(record.contributor.clone());
        }
    }

    PartnerWeekPoint {
        week: display_label(label),
        issue_count: records
            .iter()
            .map(|record| u64::from(record.issue_count))
            .sum(),
        contributor_names,
        engagement_level: engagement_rate(records.iter().copied()),
    }
}
