use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecommendationItem, RecommendationType};

/// Where a ranked result's underlying data came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Cache,
    DummyData,
}

/// Filters applied by the ranking engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingFilters {
    /// Category allow-list; `None` keeps every known category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecommendationType>,
    /// Per-category result cap, applied by truncation
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum ranking score an item must reach to be kept
    #[serde(default)]
    pub min_score: f64,
}

fn default_limit() -> usize {
    5
}

impl Default for RankingFilters {
    fn default() -> Self {
        Self {
            category: None,
            limit: default_limit(),
            min_score: 0.0,
        }
    }
}

/// Aggregate metadata over the kept items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingMetadata {
    pub total_results: usize,
    pub categories: Vec<String>,
    pub average_scores: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_scored_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_generation_time: Option<DateTime<Utc>>,
    pub ranking_processed_at: DateTime<Utc>,
}

/// Item counts before and after ranking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingInfo {
    pub raw_count: usize,
    pub final_count: usize,
}

/// The client-facing ranked, deduplicated, filtered recommendation payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedResult {
    pub user_id: String,
    pub ranked_recommendations: HashMap<String, Vec<RecommendationItem>>,
    pub metadata: RankingMetadata,
    pub applied_filters: RankingFilters,
    pub processing_info: ProcessingInfo,
    pub data_source: DataSource,
}

impl RankedResult {
    /// Total number of kept items across categories
    pub fn total_results(&self) -> usize {
        self.metadata.total_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters() {
        let filters = RankingFilters::default();
        assert_eq!(filters.limit, 5);
        assert_eq!(filters.min_score, 0.0);
        assert!(filters.category.is_none());
    }

    #[test]
    fn test_filters_deserialize_partial() {
        let filters: RankingFilters =
            serde_json::from_value(serde_json::json!({"min_score": 5.0})).unwrap();
        assert_eq!(filters.min_score, 5.0);
        assert_eq!(filters.limit, 5);
    }

    #[test]
    fn test_data_source_serialization() {
        let json = serde_json::to_string(&DataSource::DummyData).unwrap();
        assert_eq!(json, "\"dummy_data\"");
        let json = serde_json::to_string(&DataSource::Cache).unwrap();
        assert_eq!(json, "\"cache\"");
    }
}
