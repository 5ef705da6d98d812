//! Program engagement analytics: turns weekly contributor survey responses
//! into a single snapshot of program health, trends, partner activity,
//! ranked contributors and action items.

pub mod actions;
pub mod cache;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod partners;
pub mod ranking;
pub mod snapshot;
pub mod validation;
pub mod weeks;

pub use cache::SnapshotCache;
pub use config::PipelineConfig;
pub use models::{ProcessedSnapshot, RawRecord};
pub use snapshot::assemble_snapshot;
