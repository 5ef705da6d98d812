use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use program_pulse::db;
use program_pulse::enrichment::{self, HttpNarrativeService};
use program_pulse::models::{RawRecord, SnapshotExport};
use program_pulse::validation::TrackerSummary;
use program_pulse::{assemble_snapshot, PipelineConfig};

#[derive(Parser)]
#[command(name = "program-pulse")]
#[command(about = "Engagement analytics for contributor programs", long_about = None)]
struct Cli {
    /// TOML file with alias tables, partner roster and enrichment settings
    #[arg(long, global = true, env = "PROGRAM_PULSE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("source")
        .args(["cohort", "csv"])
        .multiple(false)
))]
struct Source {
    /// Cohort stored in Postgres; all cohorts when omitted
    #[arg(long)]
    cohort: Option<String>,
    /// Read responses from a CSV export instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small demo cohort
    Seed,
    /// Import survey responses from a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        cohort: String,
    },
    /// Assemble the analytics snapshot as JSON
    Snapshot {
        #[command(flatten)]
        source: Source,
        /// Issue-tracker export (JSON) to cross-check reported counts
        #[arg(long)]
        tracker: Option<PathBuf>,
        /// Add narrative insights from the configured summarizer
        #[arg(long)]
        enrich: bool,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List top contributors
    Top {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List action items
    Actions {
        #[command(flatten)]
        source: Source,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "program_pulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&connect().await?).await?;
            println!("Inserted {inserted} demo responses.");
        }
        Commands::Import { csv, cohort } => {
            let inserted = db::import_csv(&connect().await?, &csv, &cohort).await?;
            println!("Inserted {inserted} responses from {}.", csv.display());
        }
        Commands::Snapshot {
            source,
            tracker,
            enrich,
            out,
        } => {
            let records = load_records(&source).await?;
            let tracker = tracker
                .as_deref()
                .map(TrackerSummary::from_json_file)
                .transpose()?;

            let mut snapshot = assemble_snapshot(&records, tracker.as_ref(), &config);
            if enrich {
                match HttpNarrativeService::from_config(&config.enrichment) {
                    Ok(service) => {
                        snapshot =
                            enrichment::enrich(snapshot, &service, config.enrichment.timeout())
                                .await;
                    }
                    Err(err) => warn!(error = %err, "skipping enrichment"),
                }
            }

            let export = SnapshotExport {
                id: Uuid::new_v4(),
                cohort: source.cohort.as_deref(),
                generated_at: Utc::now(),
                snapshot: &snapshot,
            };
            let json = serde_json::to_string_pretty(&export)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Snapshot written to {}.", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Top { source, limit } => {
            let records = load_records(&source).await?;
            let snapshot = assemble_snapshot(&records, None, &config);

            if snapshot.top_performers.is_empty() {
                println!("No contributors found.");
                return Ok(());
            }

            println!("Top contributors:");
            for performer in snapshot.top_performers.iter().take(limit) {
                println!(
                    "- {} with {} issues (avg engagement {:.2})",
                    performer.name, performer.total_issues, performer.avg_engagement
                );
            }
        }
        Commands::Actions { source } => {
            let records = load_records(&source).await?;
            let snapshot = assemble_snapshot(&records, None, &config);

            if snapshot.action_items.is_empty() {
                println!("No action items.");
                return Ok(());
            }

            for item in &snapshot.action_items {
                println!(
                    "[{}] {}: {}\n    -> {}",
                    item.kind.as_str(),
                    item.title,
                    item.description,
                    item.action
                );
            }
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_records(source: &Source) -> anyhow::Result<Vec<RawRecord>> {
    let records = match &source.csv {
        Some(path) => db::read_csv(path)?,
        None => db::fetch_records(&connect().await?, source.cohort.as_deref()).await?,
    };
    info!(count = records.len(), "loaded responses");
    Ok(records)
}
