//! Optional narrative enrichment of a finished snapshot.
//!
//! The summarizer is an opaque remote service behind [`NarrativeService`].
//! Enrichment is strictly additive: whatever goes wrong, the caller gets the
//! base snapshot back with an empty insights block.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EnrichmentConfig;
use crate::error::EnrichmentError;
use crate::models::{EngagementTrendPoint, Insights, ProcessedSnapshot, ProgramHealth, Totals};

/// How many of the most recent weeks go into the request.
const RECENT_WEEKS: usize = 4;

const SYSTEM_PROMPT: &str = "You analyse weekly engagement data for an open-source contributor \
program. Reply with a single JSON object with the keys trends, concerns, recommendations, \
achievements (arrays of short strings) and engagementScore, technicalProgressScore, \
collaborationScore (numbers from 0 to 100).";

/// Summarized view of a snapshot sent to the summarizer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub totals: Totals,
    pub program_health: ProgramHealth,
    pub recent_weeks: Vec<EngagementTrendPoint>,
    pub partner_issues: Vec<(String, u64)>,
    pub top_performers: Vec<String>,
    pub action_items: Vec<String>,
}

impl InsightRequest {
    pub fn from_snapshot(snapshot: &ProcessedSnapshot) -> Self {
        let skip = snapshot.engagement_trends.len().saturating_sub(RECENT_WEEKS);
        Self {
            totals: snapshot.totals.clone(),
            program_health: snapshot.program_health.clone(),
            recent_weeks: snapshot.engagement_trends[skip..].to_vec(),
            partner_issues: snapshot
                .tech_partners
                .iter()
                .map(|partner| (partner.partner.clone(), partner.total_issues))
                .collect(),
            top_performers: snapshot
                .top_performers
                .iter()
                .map(|performer| performer.name.clone())
                .collect(),
            action_items: snapshot
                .action_items
                .iter()
                .map(|item| item.title.clone())
                .collect(),
        }
    }
}

/// Loosely typed reply: any section may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightResponse {
    pub trends: Option<Vec<String>>,
    pub concerns: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub achievements: Option<Vec<String>>,
    pub engagement_score: Option<f64>,
    pub technical_progress_score: Option<f64>,
    pub collaboration_score: Option<f64>,
}

impl InsightResponse {
    pub fn into_insights(self) -> Insights {
        Insights {
            trends: clean_lines(self.trends),
            concerns: clean_lines(self.concerns),
            recommendations: clean_lines(self.recommendations),
            achievements: clean_lines(self.achievements),
            engagement_score: bounded_score(self.engagement_score),
            technical_progress_score: bounded_score(self.technical_progress_score),
            collaboration_score: bounded_score(self.collaboration_score),
        }
    }
}

fn clean_lines(lines: Option<Vec<String>>) -> Vec<String> {
    lines
        .unwrap_or_default()
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn bounded_score(score: Option<f64>) -> u8 {
    match score {
        Some(value) if value.is_finite() => value.clamp(0.0, 100.0).round() as u8,
        _ => 0,
    }
}

#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn generate(&self, request: &InsightRequest) -> Result<InsightResponse, EnrichmentError>;
}

/// Merges narrative insights into `snapshot`, bounded by `timeout`.
pub async fn enrich(
    mut snapshot: ProcessedSnapshot,
    service: &dyn NarrativeService,
    timeout: Duration,
) -> ProcessedSnapshot {
    let request = InsightRequest::from_snapshot(&snapshot);
    let outcome = match tokio::time::timeout(timeout, service.generate(&request)).await {
        Ok(result) => result,
        Err(_) => Err(EnrichmentError::Timeout(timeout)),
    };

    snapshot.insights = match outcome {
        Ok(response) => response.into_insights(),
        Err(err) => {
            tracing::warn!(error = %err, "narrative enrichment failed; keeping base snapshot");
            Insights::default()
        }
    };
    snapshot
}

/// Chat-completions backed summarizer.
pub struct HttpNarrativeService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpNarrativeService {
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                EnrichmentError::NotConfigured(format!("{} is not set", config.api_key_env))
            })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("program-pulse/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(&self, request: &InsightRequest) -> Result<serde_json::Value, EnrichmentError> {
        let metrics = serde_json::to_string(request)
            .map_err(|e| EnrichmentError::Parse(format!("failed to encode metrics: {e}")))?;
        Ok(serde_json::json!({
            "model": self.model,
            "temperature": 0.3,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": metrics },
            ],
        }))
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl NarrativeService for HttpNarrativeService {
    async fn generate(&self, request: &InsightRequest) -> Result<InsightResponse, EnrichmentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EnrichmentError::Parse("response had no message content".to_string()))?;
        parse_insight_content(&content)
    }
}

/// Accepts bare JSON or JSON wrapped in a Markdown code fence.
pub fn parse_insight_content(content: &str) -> Result<InsightResponse, EnrichmentError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| EnrichmentError::Parse(e.to_string()))
}
