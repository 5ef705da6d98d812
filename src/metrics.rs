use std::collections::BTreeSet;

use crate::models::{
    EngagementRecord, EngagementTrendPoint, FeedbackSentiment, ProgramHealth,
    TechnicalProgressPoint, Totals, WeekBucket,
};
use crate::weeks::display_label;

const POSITIVE_WORDS: [&str; 10] = [
    "great", "good", "excellent", "helpful", "love", "enjoy", "awesome", "amazing", "useful",
    "thank",
];
const NEGATIVE_WORDS: [&str; 9] = [
    "bad", "difficult", "confus", "frustrat", "slow", "hard", "unclear", "poor", "problem",
];

/// Halves round toward positive infinity, so -2.5 becomes -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Net Promoter Score over answered likelihoods (scores above zero).
pub fn net_promoter_score(records: &[EngagementRecord]) -> i32 {
    let scores: Vec<u8> = records
        .iter()
        .filter_map(|record| record.recommend_likelihood)
        .filter(|score| *score > 0)
        .collect();
    if scores.is_empty() {
        return 0;
    }

    let promoters = scores.iter().filter(|score| **score >= 9).count() as f64;
    let detractors = scores.iter().filter(|score| **score <= 6).count() as f64;
    round_half_up((promoters - detractors) / scores.len() as f64 * 100.0) as i32
}

/// Share of records at tier 2 or above, as a rounded percentage.
pub fn engagement_rate<'a, I>(records: I) -> u32
where
    I: IntoIterator<Item = &'a EngagementRecord>,
{
    let (engaged, total) = records.into_iter().fold((0usize, 0usize), |(engaged, total), r| {
        (engaged + usize::from(r.engagement_tier >= 2), total + 1)
    });
    if total == 0 {
        return 0;
    }
    round_half_up(engaged as f64 / total as f64 * 100.0) as u32
}

/// Signed percentage change in issue totals between the last two weeks.
pub fn weekly_change(buckets: &[WeekBucket<'_>]) -> i64 {
    let [.., previous, current] = buckets else {
        return 0;
    };
    let previous = bucket_issues(previous);
    let current = bucket_issues(current);

    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    round_half_up((current as f64 - previous as f64) / previous as f64 * 100.0)
}

pub fn bucket_issues(bucket: &WeekBucket<'_>) -> u64 {
    bucket
        .records
        .iter()
        .map(|record| u64::from(record.issue_count))
        .sum()
}

/// Contributors are counted by submitted name, before alias resolution.
pub fn totals(records: &[EngagementRecord], buckets: &[WeekBucket<'_>]) -> Totals {
    let contributors: BTreeSet<&str> = records
        .iter()
        .map(|record| record.raw_name.as_str())
        .filter(|name| !name.is_empty())
        .collect();

    Totals {
        total_contributors: contributors.len(),
        total_contributions: records
            .iter()
            .map(|record| u64::from(record.issue_count))
            .sum(),
        total_responses: records.len(),
        weekly_change: weekly_change(buckets),
    }
}

/// Partners named on at least one collaboration-flagged record.
pub fn active_tech_partners(records: &[EngagementRecord]) -> usize {
    records
        .iter()
        .filter(|record| record.collaborated)
        .flat_map(|record| record.partners.iter())
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn program_health(records: &[EngagementRecord]) -> ProgramHealth {
    ProgramHealth {
        net_promoter_score: net_promoter_score(records),
        engagement_rate: engagement_rate(records),
        active_tech_partners: active_tech_partners(records),
    }
}

pub fn engagement_trends(buckets: &[WeekBucket<'_>]) -> Vec<EngagementTrendPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let tier_count = |tier: u8| {
                bucket
                    .records
                    .iter()
                    .filter(|record| record.engagement_tier == tier)
                    .count()
            };
            EngagementTrendPoint {
                week: display_label(&bucket.label),
                highly_engaged: tier_count(3),
                moderately_engaged: tier_count(2),
                low_engaged: tier_count(1),
                total: bucket.records.len(),
            }
        })
        .collect()
}

pub fn technical_progress(buckets: &[WeekBucket<'_>]) -> Vec<TechnicalProgressPoint> {
    buckets
        .iter()
        .map(|bucket| TechnicalProgressPoint {
            week: display_label(&bucket.label),
            total_issues: bucket_issues(bucket),
            contributors: bucket
                .records
                .iter()
                .map(|record| record.contributor.as_str())
                .filter(|name| !name.is_empty())
                .collect::<BTreeSet<_>>()
                .len(),
        })
        .collect()
}

pub fn feedback_sentiment(records: &[EngagementRecord]) -> FeedbackSentiment {
    let mut sentiment = FeedbackSentiment::default();

    for feedback in records.iter().filter_map(|record| record.feedback.as_deref()) {
        let text = feedback.to_lowercase();
        let positive = POSITIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
        let negative = NEGATIVE_WORDS.iter().filter(|w| text.contains(*w)).count();

        if negative > 0 && negative >= positive {
            sentiment.negative += 1;
        } else if positive > 0 {
            sentiment.positive += 1;
        } else {
            sentiment.neutral += 1;
        }
    }

    sentiment
}
