//! Pipeline configuration: alias tables, curated duplicate-name rules, the
//! partner roster and the knobs for ranking, cross-validation, enrichment
//! and caching. Every field has a default so running without a file works.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_TOP_PERFORMER_LIMIT: usize = 10;
const DEFAULT_ENRICHMENT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_ENRICHMENT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Contributor aliases, keyed by the lower-cased submitted name.
    pub contributor_aliases: BTreeMap<String, String>,
    /// Partner aliases, keyed by the lower-cased submitted partner name.
    pub partner_aliases: BTreeMap<String, String>,
    /// Manually curated duplicate identities, applied after the alias table.
    pub duplicate_rules: Vec<DuplicateRule>,
    /// Partners expected to collaborate even if nobody reported them yet.
    pub partners: Vec<String>,
    /// Ordering keys of the weeks in which new contributors onboard.
    pub new_contributor_weeks: Vec<u32>,
    /// At most ten performers are ever listed.
    pub top_performer_limit: usize,
    /// Allowed absolute gap between self-reported and tracked issue counts.
    pub discrepancy_tolerance: u64,
    pub enrichment: EnrichmentConfig,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DuplicateRule {
    pub name: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let contributor_aliases = [
            ("mike", "Michael"),
            ("mikey", "Michael"),
            ("jon", "Jonathan"),
            ("alex", "Alexander"),
        ]
        .into_iter()
        .map(|(alias, name)| (alias.to_string(), name.to_string()))
        .collect();

        let partner_aliases = [
            ("ipfs", "IPFS"),
            ("libp2p", "Libp2p"),
            ("lib p2p", "Libp2p"),
            ("filecoin", "Filecoin"),
            ("fil", "Filecoin"),
        ]
        .into_iter()
        .map(|(alias, name)| (alias.to_string(), name.to_string()))
        .collect();

        Self {
            contributor_aliases,
            partner_aliases,
            duplicate_rules: vec![DuplicateRule {
                name: "Jonathon".to_string(),
                canonical: "Jonathan".to_string(),
            }],
            partners: Vec::new(),
            new_contributor_weeks: vec![1, 2],
            top_performer_limit: DEFAULT_TOP_PERFORMER_LIMIT,
            discrepancy_tolerance: 0,
            enrichment: EnrichmentConfig::default(),
            cache_ttl_secs: 300,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENRICHMENT_URL.to_string(),
            model: DEFAULT_ENRICHMENT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 30,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PipelineConfig {
    /// Loads the TOML file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.contributor_aliases = lowercase_keys(config.contributor_aliases);
        config.partner_aliases = lowercase_keys(config.partner_aliases);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=DEFAULT_TOP_PERFORMER_LIMIT).contains(&self.top_performer_limit) {
            return Err(ConfigError::Invalid(format!(
                "top_performer_limit must be between 1 and {DEFAULT_TOP_PERFORMER_LIMIT}"
            )));
        }
        if self.enrichment.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "enrichment.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn lowercase_keys(map: BTreeMap<String, String>) -> BTreeMap<String, String> {
    map.into_iter()
        .map(|(alias, name)| (alias.trim().to_lowercase(), name))
        .collect()
}
