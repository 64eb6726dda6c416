use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{RawRecommendationSet, RecommendationItem, RecommendationType};
use crate::services::providers::LlmProvider;

/// Request payload for the prefetch service's generate endpoint
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    recommendation_type: RecommendationType,
    max_results: usize,
    parameters: SamplingParameters,
}

#[derive(Debug, Serialize)]
struct SamplingParameters {
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    recommendations: HashMap<String, Vec<RecommendationItem>>,
}

/// HTTP client for the LLM prefetch service
#[derive(Clone)]
pub struct LlmService {
    http_client: HttpClient,
    base_url: String,
}

impl LlmService {
    pub fn new(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for LlmService {
    async fn generate(
        &self,
        prompt: &str,
        recommendation_type: RecommendationType,
        max_results: usize,
    ) -> AppResult<RawRecommendationSet> {
        let url = format!("{}/generate", self.base_url);

        tracing::debug!(
            recommendation_type = %recommendation_type,
            prompt_len = prompt.len(),
            "Calling LLM service"
        );

        let request = GenerateRequest {
            prompt,
            recommendation_type,
            max_results,
            parameters: SamplingParameters::default(),
        };

        let response = self.http_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "LLM service request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "LLM service returned status {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json().await?;

        let set = RawRecommendationSet {
            recommendations: generated.recommendations,
            generated_at: Utc::now(),
        };

        tracing::info!(
            recommendation_type = %recommendation_type,
            count = set.total_count(),
            "LLM call completed"
        );

        Ok(set)
    }
}
