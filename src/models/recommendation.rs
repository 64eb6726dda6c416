use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recommendation categories supported by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Music,
    Movie,
    Place,
    Event,
}

impl RecommendationType {
    /// Canonical ordering, used for deterministic iteration and tie-breaks
    pub const ALL: [RecommendationType; 4] = [
        RecommendationType::Music,
        RecommendationType::Movie,
        RecommendationType::Place,
        RecommendationType::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::Music => "music",
            RecommendationType::Movie => "movie",
            RecommendationType::Place => "place",
            RecommendationType::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "music" => Some(RecommendationType::Music),
            "movie" => Some(RecommendationType::Movie),
            "place" => Some(RecommendationType::Place),
            "event" => Some(RecommendationType::Event),
            _ => None,
        }
    }
}

impl Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recommendation as produced by the LLM.
///
/// Items carry either a `title` (movies, music) or a `name` (places, events).
/// Known fields are typed; anything else the provider attaches survives in
/// the flattened metadata map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Assigned by the ranking engine, not the LLM
    #[serde(default)]
    pub ranking_score: f64,
    #[serde(flatten)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RecommendationItem {
    /// The display name: `title` where present, otherwise `name`
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// The genre/type field used for scoring
    pub fn genre_or_kind(&self) -> &str {
        self.genre
            .as_deref()
            .or(self.kind.as_deref())
            .unwrap_or_default()
    }
}

/// Unranked LLM output, grouped by category.
///
/// Category keys are plain strings at the wire boundary; the ranking engine
/// drops keys outside [`RecommendationType::ALL`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecommendationSet {
    pub recommendations: HashMap<String, Vec<RecommendationItem>>,
    pub generated_at: DateTime<Utc>,
}

impl RawRecommendationSet {
    pub fn new(recommendations: HashMap<String, Vec<RecommendationItem>>) -> Self {
        Self {
            recommendations,
            generated_at: Utc::now(),
        }
    }

    /// Total item count across all categories
    pub fn total_count(&self) -> usize {
        self.recommendations.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}
