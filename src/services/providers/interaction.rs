use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;

use crate::error::{AppError, AppResult};
use crate::models::InteractionData;
use crate::services::providers::InteractionProvider;

/// HTTP client for the Customer Interaction Service
#[derive(Clone)]
pub struct InteractionService {
    http_client: HttpClient,
    base_url: String,
}

impl InteractionService {
    pub fn new(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl InteractionProvider for InteractionService {
    async fn fetch_interactions(&self, user_id: &str) -> AppResult<Option<InteractionData>> {
        let url = format!("{}/users/{}/interactions", self.base_url, user_id);

        tracing::debug!(user_id = %user_id, "Fetching interaction data");

        let response = self.http_client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(user_id = %user_id, "No interaction data for user");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Interaction service returned status {}: {}",
                status, body
            )));
        }

        let interactions: InteractionData = response.json().await?;

        tracing::debug!(
            user_id = %user_id,
            recent = interactions.recent_interactions.len(),
            "Fetched interaction data"
        );

        Ok(Some(interactions))
    }
}
