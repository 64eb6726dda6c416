use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecommendationType;

/// Profile data from the User Profile Service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub preferences: HashMap<String, serde_json::Value>,
}

/// Location data from the Location Information Engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationData {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_location: Option<String>,
    #[serde(default)]
    pub travel_history: Vec<String>,
}

/// Interaction data from the Customer Interaction Service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionData {
    pub user_id: String,
    #[serde(default)]
    pub recent_interactions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
}

/// Everything fetched about a user for one pipeline invocation.
///
/// Any sub-bundle may be absent when its collaborator failed; absence only
/// reduces prompt richness and is never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDataBundle {
    pub profile: Option<UserProfile>,
    pub location: Option<LocationData>,
    pub interaction: Option<InteractionData>,
    pub fetched_at: DateTime<Utc>,
}

impl UserDataBundle {
    pub fn new(
        profile: Option<UserProfile>,
        location: Option<LocationData>,
        interaction: Option<InteractionData>,
    ) -> Self {
        Self {
            profile,
            location,
            interaction,
            fetched_at: Utc::now(),
        }
    }

    /// True when every collaborator came back empty
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.location.is_none() && self.interaction.is_none()
    }
}

/// A prompt built for one (user, type) invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptRecord {
    pub prompt: String,
    pub recommendation_type: RecommendationType,
    pub built_at: DateTime<Utc>,
}

impl PromptRecord {
    pub fn new(prompt: String, recommendation_type: RecommendationType) -> Self {
        Self {
            prompt,
            recommendation_type,
            built_at: Utc::now(),
        }
    }
}
