use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{EngagementRecord, WeekBucket};

static WEEK_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Week\s+(\d+)").unwrap());
static TRAILING_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

/// Ordering key for a week label: the number after "Week ", or 0.
pub fn week_order(label: &str) -> u32 {
    WEEK_NUMBER
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|number| number.as_str().parse().ok())
        .unwrap_or(0)
}

/// "Week 3 (2024-01-20)" renders as "Week 3".
pub fn display_label(label: &str) -> String {
    let stripped = TRAILING_ANNOTATION.replace(label.trim(), "");
    if stripped.is_empty() {
        label.trim().to_string()
    } else {
        stripped.into_owned()
    }
}

/// Groups records by exact (trimmed) week label and orders the buckets by
/// their week number. Records without a label stay out of every bucket.
pub fn index_weeks(records: &[EngagementRecord]) -> Vec<WeekBucket<'_>> {
    let mut buckets: Vec<WeekBucket<'_>> = Vec::new();

    for record in records {
        let label = record.week.trim();
        if label.is_empty() {
            continue;
        }
        match buckets.iter_mut().find(|bucket| bucket.label == label) {
            Some(bucket) => bucket.records.push(record),
            None => buckets.push(WeekBucket {
                label: label.to_string(),
                order: week_order(label),
                records: vec![record],
            }),
        }
    }

    // Stable sort keeps first-seen order for equal keys.
    buckets.sort_by_key(|bucket| bucket.order);
    tracing::debug!(weeks = buckets.len(), "indexed week buckets");
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, week: &str) -> EngagementRecord {
        EngagementRecord {
            raw_name: name.to_string(),
            contributor: name.to_string(),
            week: week.to_string(),
            engagement_tier: 0,
            collaborated: false,
            partners: Vec::new(),
            issue_count: 0,
            recommend_likelihood: None,
            feedback: None,
        }
    }

    #[test]
    fn order_comes_from_week_number() {
        assert_eq!(week_order("Week 3 (2024-01-20)"), 3);
        assert_eq!(week_order("Program Week 12"), 12);
        assert_eq!(week_order("Kickoff"), 0);
        assert_eq!(week_order("week 4"), 0);
    }

    #[test]
    fn display_strips_trailing_date() {
        assert_eq!(display_label("Week 3 (2024-01-20)"), "Week 3");
        assert_eq!(display_label("Week 10"), "Week 10");
        assert_eq!(display_label("(pilot)"), "(pilot)");
    }

    #[test]
    fn buckets_sort_numerically_not_lexically() {
        let records = vec![
            record("a", "Week 10"),
            record("b", "Week 2"),
            record("c", "Week 1"),
            record("d", "Week 2"),
        ];
        let buckets = index_weeks(&records);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Week 1", "Week 2", "Week 10"]);
        assert_eq!(buckets[1].records.len(), 2);
        assert_eq!(buckets[2].order, 10);
    }

    #[test]
    fn ties_keep_insertion_order_and_unlabelled_records_drop_out() {
        let records = vec![
            record("a", "Orientation"),
            record("b", ""),
            record("c", "Kickoff"),
        ];
        let buckets = index_weeks(&records);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Orientation", "Kickoff"]);
        assert!(buckets.iter().all(|b| b.order == 0));
    }
}
