use std::io::Read;
use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    RawRecord, FIELD_COLLABORATION, FIELD_ENGAGEMENT, FIELD_FEEDBACK, FIELD_ISSUES, FIELD_NAME,
    FIELD_PARTNERS, FIELD_RECOMMEND, FIELD_WEEK, RECORD_FIELDS,
};

const FIELD_SOURCE_KEY: &str = "source_key";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Demo cohort, one row per response in `RECORD_FIELDS` order.
const SEED_RESPONSES: [[&str; 8]; 6] = [
    [
        "Avery Lee",
        "Week 1 (2026-01-05)",
        "3 - Highly engaged",
        "Yes",
        "IPFS",
        "4",
        "9",
        "Mentors were really helpful",
    ],
    [
        "Jules Moreno",
        "Week 1 (2026-01-05)",
        "2 - Participated occasionally",
        "Yes",
        "Libp2p",
        "2",
        "8",
        "",
    ],
    [
        "Kiara Patel",
        "Week 1 (2026-01-05)",
        "3 - Highly engaged",
        "No",
        "Filecoin",
        "1",
        "10",
        "Great kickoff",
    ],
    [
        "Avery Lee",
        "Week 2 (2026-01-12)",
        "3 - Highly engaged",
        "Yes",
        "IPFS, Libp2p",
        "6",
        "9",
        "",
    ],
    [
        "Jules Moreno",
        "Week 2 (2026-01-12)",
        "1 - Barely participated",
        "No",
        "",
        "0",
        "5",
        "Setup docs were confusing",
    ],
    [
        "Kiara Patel",
        "Week 2 (2026-01-12)",
        "2 - Participated occasionally",
        "Yes",
        "Filecoin",
        "3",
        "7",
        "",
    ],
];

fn seed_records() -> Vec<RawRecord> {
    SEED_RESPONSES
        .iter()
        .map(|values| {
            RECORD_FIELDS
                .iter()
                .zip(values.iter())
                .fold(RawRecord::new(), |record, (field, value)| {
                    record.with(field, value)
                })
        })
        .collect()
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for (row, record) in seed_records().iter().enumerate() {
        inserted += insert_record(pool, "demo", row, record).await?;
    }

    Ok(inserted)
}

/// Rows are returned in insertion order.
fn records_query(by_cohort: bool) -> String {
    let mut query = String::from(
        "SELECT name, week, engagement_participation, tech_partner_collaboration, \
         tech_partners, issues_count, recommend_likelihood, feedback \
         FROM program_pulse.responses",
    );
    if by_cohort {
        query.push_str(" WHERE cohort = $1");
    }
    query.push_str(" ORDER BY seq");
    query
}

pub async fn fetch_records(pool: &PgPool, cohort: Option<&str>) -> anyhow::Result<Vec<RawRecord>> {
    let query = records_query(cohort.is_some());
    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    }

    let rows = rows
        .fetch_all(pool)
        .await
        .context("failed to fetch responses")?;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let mut record = RawRecord::new();
        for field in RECORD_FIELDS {
            if let Some(value) = row.try_get::<Option<String>, _>(field)? {
                record.insert(field, &value);
            }
        }
        records.push(record);
    }

    Ok(records)
}

/// Loads raw records from a CSV export with a header row.
pub fn read_csv(csv_path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    read_csv_from(file)
}

pub fn read_csv_from<R: Read>(source: R) -> anyhow::Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result?;
        let mut record = RawRecord::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            record.insert(header, value);
        }
        records.push(record);
    }

    tracing::debug!(count = records.len(), "read csv records");
    Ok(records)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path, cohort: &str) -> anyhow::Result<usize> {
    let records = read_csv(csv_path)?;
    let mut inserted = 0usize;

    for (row, record) in records.iter().enumerate() {
        inserted += insert_record(pool, cohort, row, record).await?;
    }

    Ok(inserted)
}

/// Rows without an explicit source key get one derived from the cohort, the
/// row position and a digest of every field, so re-importing the same export
/// is a no-op while distinct anonymous rows never collide.
pub fn source_key(cohort: &str, row: usize, record: &RawRecord) -> String {
    if let Some(key) = record.get(FIELD_SOURCE_KEY) {
        return key.to_string();
    }

    let mut hasher = Sha256::new();
    for field in RECORD_FIELDS {
        hasher.update(record.get(field).unwrap_or_default().as_bytes());
        hasher.update([0x1f_u8]);
    }
    format!("{}:{}:{:x}", cohort, row, hasher.finalize())
}

async fn insert_record(
    pool: &PgPool,
    cohort: &str,
    row: usize,
    record: &RawRecord,
) -> anyhow::Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO program_pulse.responses
        (id, cohort, source_key, name, week, engagement_participation,
         tech_partner_collaboration, tech_partners, issues_count,
         recommend_likelihood, feedback)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cohort)
    .bind(source_key(cohort, row, record))
    .bind(record.get(FIELD_NAME))
    .bind(record.get(FIELD_WEEK))
    .bind(record.get(FIELD_ENGAGEMENT))
    .bind(record.get(FIELD_COLLABORATION))
    .bind(record.get(FIELD_PARTNERS))
    .bind(record.get(FIELD_ISSUES))
    .bind(record.get(FIELD_RECOMMEND))
    .bind(record.get(FIELD_FEEDBACK))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}
