use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;

use crate::error::{AppError, AppResult};
use crate::models::LocationData;
use crate::services::providers::LocationProvider;

/// HTTP client for the Location Information Engine
#[derive(Clone)]
pub struct LocationService {
    http_client: HttpClient,
    base_url: String,
}

impl LocationService {
    pub fn new(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LocationProvider for LocationService {
    async fn fetch_location(&self, user_id: &str) -> AppResult<Option<LocationData>> {
        let url = format!("{}/users/{}/location", self.base_url, user_id);

        tracing::debug!(user_id = %user_id, "Fetching location data");

        let response = self.http_client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(user_id = %user_id, "No location data for user");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Location service returned status {}: {}",
                status, body
            )));
        }

        let location: LocationData = response.json().await?;

        Ok(Some(location))
    }
}
