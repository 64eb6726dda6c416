use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;

use crate::error::{AppError, AppResult};
use crate::models::UserProfile;
use crate::services::providers::ProfileProvider;

/// HTTP client for the User Profile Service
#[derive(Clone)]
pub struct ProfileService {
    http_client: HttpClient,
    base_url: String,
}

impl ProfileService {
    pub fn new(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProfileProvider for ProfileService {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let url = format!("{}/users/{}/profile", self.base_url, user_id);

        tracing::debug!(user_id = %user_id, "Fetching user profile");

        let response = self.http_client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(user_id = %user_id, "No profile for user");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Profile service returned status {}: {}",
                status, body
            )));
        }

        let profile: UserProfile = response.json().await?;

        tracing::debug!(
            user_id = %user_id,
            interests = profile.interests.len(),
            "Fetched user profile"
        );

        Ok(Some(profile))
    }
}
