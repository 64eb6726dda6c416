use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{get_json, CacheKey, CacheStore};
use crate::models::{
    DataSource, ProcessingInfo, PromptRecord, RankedResult, RankingFilters, RankingMetadata,
    RawRecommendationSet, RecommendationItem, RecommendationType,
};

/// Turns cached raw recommendation sets into ranked, deduplicated, filtered
/// results.
///
/// Ranking never fails outward: missing data and cache read errors both
/// degrade to a built-in example dataset marked `data_source = "dummy_data"`,
/// so the API boundary always has a renderable shape.
pub struct RankingEngine {
    cache: Arc<dyn CacheStore>,
}

impl RankingEngine {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Ranks, dedups and filters the user's cached recommendations
    pub async fn rank(&self, user_id: &str, filters: RankingFilters) -> RankedResult {
        tracing::debug!(user_id = %user_id, ?filters, "Ranking recommendations");

        match self.load_scored(user_id).await {
            Ok(Some(loaded)) => self.assemble(user_id, loaded, filters, DataSource::Cache),
            Ok(None) => {
                tracing::info!(user_id = %user_id, "No stored recommendations, using dummy ranked data");
                self.dummy_result(user_id, filters)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Cache read failed during ranking, using dummy ranked data");
                self.dummy_result(user_id, filters)
            }
        }
    }

    /// Reads the cached raw set of every known type for the user, scoring
    /// each set's items against that set's cached prompt, and merges the
    /// category maps. Unknown category keys are dropped.
    async fn load_scored(&self, user_id: &str) -> crate::error::AppResult<Option<LoadedSets>> {
        let mut merged: HashMap<String, Vec<RecommendationItem>> = HashMap::new();
        let mut generated_at: Option<DateTime<Utc>> = None;
        let mut found = false;

        for rec_type in RecommendationType::ALL {
            let key = CacheKey::Recommendations(user_id.to_string(), rec_type);
            let Some(set) = get_json::<RawRecommendationSet>(self.cache.as_ref(), &key).await?
            else {
                continue;
            };
            found = true;

            let prompt_key = CacheKey::Prompt(user_id.to_string(), rec_type);
            let prompt = get_json::<PromptRecord>(self.cache.as_ref(), &prompt_key)
                .await
                .unwrap_or(None)
                .map(|record| record.prompt)
                .unwrap_or_default();

            generated_at = match generated_at {
                Some(existing) => Some(existing.max(set.generated_at)),
                None => Some(set.generated_at),
            };

            for (category, items) in set.recommendations {
                if RecommendationType::parse(&category).is_none() {
                    tracing::debug!(category = %category, "Dropping unknown category");
                    continue;
                }
                let scored = items.into_iter().map(|mut item| {
                    item.ranking_score = score_item(&item, &prompt);
                    item
                });
                merged.entry(category).or_default().extend(scored);
            }
        }

        if !found {
            return Ok(None);
        }

        Ok(Some(LoadedSets {
            recommendations: merged,
            generated_at,
        }))
    }

    /// Sorts, dedups, filters and aggregates one merged category map
    fn assemble(
        &self,
        user_id: &str,
        loaded: LoadedSets,
        filters: RankingFilters,
        data_source: DataSource,
    ) -> RankedResult {
        let raw_count = loaded.recommendations.values().map(Vec::len).sum();

        let mut ranked = loaded.recommendations;
        for items in ranked.values_mut() {
            items.sort_by(|a, b| {
                b.ranking_score
                    .partial_cmp(&a.ranking_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let deduplicated = deduplicate(ranked);
        let filtered = apply_filters(deduplicated, &filters);
        let metadata = calculate_metadata(&filtered, loaded.generated_at);
        let final_count = metadata.total_results;

        RankedResult {
            user_id: user_id.to_string(),
            ranked_recommendations: filtered,
            metadata,
            applied_filters: filters,
            processing_info: ProcessingInfo {
                raw_count,
                final_count,
            },
            data_source,
        }
    }

    /// Ranked result over the built-in example dataset
    fn dummy_result(&self, user_id: &str, filters: RankingFilters) -> RankedResult {
        let loaded = LoadedSets {
            recommendations: dummy_recommendations(),
            generated_at: None,
        };
        self.assemble(user_id, loaded, filters, DataSource::DummyData)
    }
}

struct LoadedSets {
    recommendations: HashMap<String, Vec<RecommendationItem>>,
    generated_at: Option<DateTime<Utc>>,
}

/// Scores one item against the prompt it was generated from.
///
/// Base 1.0, +5.0 for a prompt-word match in the title/name, +3.0 in the
/// genre/type, +2.0 in the description. Only prompt words longer than three
/// characters count; matching is case-insensitive substring containment.
fn score_item(item: &RecommendationItem, prompt: &str) -> f64 {
    let prompt_lower = prompt.to_lowercase();
    let words: Vec<&str> = prompt_lower
        .split_whitespace()
        .filter(|word| word.len() > 3)
        .collect();

    let mut score: f64 = 1.0;

    let name = item.display_name().to_lowercase();
    if words.iter().any(|word| name.contains(word)) {
        score += 5.0;
    }

    let genre = item.genre_or_kind().to_lowercase();
    if words.iter().any(|word| genre.contains(word)) {
        score += 3.0;
    }

    let description = item
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if words.iter().any(|word| description.contains(word)) {
        score += 2.0;
    }

    (score * 100.0).round() / 100.0
}

/// Keeps only the first occurrence of each normalized title, per category.
///
/// Categories deduplicate independently; the same title may survive in two
/// different categories.
fn deduplicate(
    recommendations: HashMap<String, Vec<RecommendationItem>>,
) -> HashMap<String, Vec<RecommendationItem>> {
    recommendations
        .into_iter()
        .map(|(category, items)| {
            let mut seen = std::collections::HashSet::new();
            let unique = items
                .into_iter()
                .filter(|item| {
                    let title_key = item.display_name().to_lowercase().trim().to_string();
                    !title_key.is_empty() && seen.insert(title_key)
                })
                .collect();
            (category, unique)
        })
        .collect()
}

/// Applies the category allow-list, the minimum-score threshold and the
/// per-category cap, in that order. The cap truncates, preserving order.
fn apply_filters(
    recommendations: HashMap<String, Vec<RecommendationItem>>,
    filters: &RankingFilters,
) -> HashMap<String, Vec<RecommendationItem>> {
    recommendations
        .into_iter()
        .filter(|(category, _)| match filters.category {
            Some(allowed) => category.as_str() == allowed.as_str(),
            None => true,
        })
        .map(|(category, items)| {
            let mut kept: Vec<RecommendationItem> = items
                .into_iter()
                .filter(|item| item.ranking_score >= filters.min_score)
                .collect();
            kept.truncate(filters.limit);
            (category, kept)
        })
        .collect()
}

/// Aggregates totals and per-category averages over the kept items.
///
/// Iteration follows the canonical category order so the highest-average
/// tie-break is deterministic.
fn calculate_metadata(
    recommendations: &HashMap<String, Vec<RecommendationItem>>,
    generated_at: Option<DateTime<Utc>>,
) -> RankingMetadata {
    let mut categories = Vec::new();
    let mut average_scores = HashMap::new();
    let mut total_results = 0;
    let mut highest: Option<(String, f64)> = None;

    for rec_type in RecommendationType::ALL {
        let Some(items) = recommendations.get(rec_type.as_str()) else {
            continue;
        };
        let category = rec_type.as_str().to_string();
        categories.push(category.clone());
        total_results += items.len();

        let average = if items.is_empty() {
            0.0
        } else {
            let sum: f64 = items.iter().map(|item| item.ranking_score).sum();
            (sum / items.len() as f64 * 100.0).round() / 100.0
        };
        average_scores.insert(category.clone(), average);

        match &highest {
            Some((_, best)) if average <= *best => {}
            _ => highest = Some((category, average)),
        }
    }

    RankingMetadata {
        total_results,
        categories,
        average_scores,
        highest_scored_category: highest.map(|(category, _)| category),
        original_generation_time: generated_at,
        ranking_processed_at: Utc::now(),
    }
}

/// Fixed example dataset returned when no real data exists for the user
fn dummy_recommendations() -> HashMap<String, Vec<RecommendationItem>> {
    serde_json::from_value(serde_json::json!({
        "movie": [
            {"title": "Vicky Cristina Barcelona", "genre": "Romance-Drama", "description": "A romantic story set in Barcelona", "ranking_score": 8.5},
            {"title": "L'Auberge Espagnole", "genre": "Comedy-Drama", "description": "Students living in Barcelona", "ranking_score": 8.2},
            {"title": "All About My Mother", "genre": "Drama", "description": "Almodóvar's masterpiece set in Barcelona", "ranking_score": 7.8},
            {"title": "Barcelona", "genre": "Comedy-Drama", "description": "Americans in 1980s Barcelona", "ranking_score": 7.5},
            {"title": "Biutiful", "genre": "Drama", "description": "Gritty Barcelona drama", "ranking_score": 7.2}
        ],
        "music": [
            {"title": "Barcelona", "artist": "Freddie Mercury & Montserrat Caballé", "description": "Olympic anthem for Barcelona", "ranking_score": 8.0},
            {"title": "Mediterráneo", "artist": "Joan Manuel Serrat", "description": "Classic Catalan folk song", "ranking_score": 7.8},
            {"title": "La Flaca", "artist": "Jarabe de Palo", "description": "Barcelona rock anthem", "ranking_score": 7.5},
            {"title": "Rumba Catalana", "artist": "Gipsy Kings", "description": "Traditional Barcelona rumba", "ranking_score": 7.2},
            {"title": "Gaudí", "artist": "Manu Chao", "description": "Tribute to Barcelona's architect", "ranking_score": 6.9}
        ],
        "place": [
            {"name": "Sagrada Família", "location": "Barcelona", "description": "Gaudí's unfinished masterpiece", "ranking_score": 9.0},
            {"name": "Park Güell", "location": "Barcelona", "description": "Colorful mosaic park by Gaudí", "ranking_score": 8.5},
            {"name": "Las Ramblas", "location": "Barcelona", "description": "Famous pedestrian street", "ranking_score": 8.2},
            {"name": "Casa Batlló", "location": "Barcelona", "description": "Modernist house by Gaudí", "ranking_score": 7.8},
            {"name": "Barceloneta Beach", "location": "Barcelona", "description": "Popular city beach", "ranking_score": 7.5}
        ],
        "event": [
            {"name": "La Mercè Festival", "location": "Barcelona", "description": "Barcelona's biggest street festival", "ranking_score": 8.8},
            {"name": "Festa Major de Gràcia", "location": "Barcelona", "description": "Neighborhood celebration with decorated streets", "ranking_score": 8.3},
            {"name": "Primavera Sound", "location": "Barcelona", "description": "International music festival", "ranking_score": 8.0},
            {"name": "Sant Jordi Day", "location": "Barcelona", "description": "Day of books and roses", "ranking_score": 7.7},
            {"name": "Nit Blanca", "location": "Barcelona", "description": "White night cultural event", "ranking_score": 7.4}
        ]
    }))
    .expect("built-in dataset is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::redis::cache::MockCacheStore;
    use crate::models::RawRecommendationSet;
    use mockall::predicate::eq;

    fn item(json: serde_json::Value) -> RecommendationItem {
        serde_json::from_value(json).unwrap()
    }

    fn engine_with_sets(
        sets: Vec<(RecommendationType, RawRecommendationSet, Option<String>)>,
    ) -> RankingEngine {
        let mut store = MockCacheStore::new();
        for (rec_type, set, prompt) in sets {
            let rec_key = CacheKey::Recommendations("u1".to_string(), rec_type);
            let payload = serde_json::to_string(&set).unwrap();
            store
                .expect_get()
                .with(eq(rec_key))
                .returning(move |_| Ok(Some(payload.clone())));

            let prompt_key = CacheKey::Prompt("u1".to_string(), rec_type);
            let prompt_payload = prompt
                .map(|p| serde_json::to_string(&PromptRecord::new(p, rec_type)).unwrap());
            store
                .expect_get()
                .with(eq(prompt_key))
                .returning(move |_| Ok(prompt_payload.clone()));
        }
        store.expect_get().returning(|_| Ok(None));
        RankingEngine::new(Arc::new(store))
    }

    fn movie_set(items: Vec<RecommendationItem>) -> RawRecommendationSet {
        let mut recommendations = HashMap::new();
        recommendations.insert("movie".to_string(), items);
        RawRecommendationSet::new(recommendations)
    }

    #[test]
    fn test_score_monotonicity() {
        let prompt = "action movies";
        let full_match = item(serde_json::json!({
            "title": "Action Movie",
            "genre": "action",
            "description": "great action film"
        }));
        let no_match = item(serde_json::json!({
            "title": "Comedy Night",
            "genre": "comedy",
            "description": "funny"
        }));

        let high = score_item(&full_match, prompt);
        let low = score_item(&no_match, prompt);
        assert_eq!(high, 11.0);
        assert_eq!(low, 1.0);
        assert!(high > low);
    }

    #[test]
    fn test_short_prompt_words_do_not_count() {
        // every prompt word is <= 3 chars, so nothing matches
        let scored = score_item(
            &item(serde_json::json!({"title": "pop hit", "genre": "pop"})),
            "pop hit mix",
        );
        assert_eq!(scored, 1.0);
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let mut recommendations = HashMap::new();
        recommendations.insert(
            "movie".to_string(),
            vec![
                item(serde_json::json!({"title": "Duplicate", "genre": "drama"})),
                item(serde_json::json!({"title": " duplicate ", "genre": "comedy"})),
                item(serde_json::json!({"title": "Other"})),
            ],
        );

        let deduped = deduplicate(recommendations);
        let movies = &deduped["movie"];
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].genre.as_deref(), Some("drama"));
    }

    #[test]
    fn test_deduplicate_is_per_category() {
        let mut recommendations = HashMap::new();
        recommendations.insert(
            "movie".to_string(),
            vec![item(serde_json::json!({"title": "Duplicate"}))],
        );
        recommendations.insert(
            "music".to_string(),
            vec![item(serde_json::json!({"title": "Duplicate"}))],
        );

        let deduped = deduplicate(recommendations);
        assert_eq!(deduped["movie"].len(), 1);
        assert_eq!(deduped["music"].len(), 1);
    }

    #[test]
    fn test_filters_apply_in_order() {
        let mut recommendations = HashMap::new();
        recommendations.insert(
            "movie".to_string(),
            (0..8)
                .map(|n| {
                    let mut i = item(serde_json::json!({"title": format!("Movie {}", n)}));
                    i.ranking_score = n as f64;
                    i
                })
                .rev()
                .collect(),
        );
        recommendations.insert(
            "music".to_string(),
            vec![item(serde_json::json!({"title": "Song"}))],
        );

        let filters = RankingFilters {
            category: Some(RecommendationType::Movie),
            limit: 3,
            min_score: 4.0,
        };
        let filtered = apply_filters(recommendations, &filters);

        assert!(!filtered.contains_key("music"));
        let movies = &filtered["movie"];
        assert_eq!(movies.len(), 3);
        assert!(movies.iter().all(|i| i.ranking_score >= 4.0));
        // truncation preserves prior (descending) order
        assert_eq!(movies[0].ranking_score, 7.0);
    }

    #[tokio::test]
    async fn test_rank_prompt_match_outranks_non_match() {
        // prompt "action movies": "Action Movie" scores 1+5+3+2 = 11.0,
        // "Comedy Movie" matches nothing and scores 1.0; min_score=5 and
        // limit=1 keep only "Action Movie"
        let set = movie_set(vec![
            item(serde_json::json!({"title": "Action Movie", "genre": "action", "description": "great action film"})),
            item(serde_json::json!({"title": "Comedy Movie", "genre": "comedy", "description": "funny"})),
        ]);
        let engine = engine_with_sets(vec![(
            RecommendationType::Movie,
            set,
            Some("action movies".to_string()),
        )]);

        let result = engine
            .rank(
                "u1",
                RankingFilters {
                    category: None,
                    limit: 1,
                    min_score: 5.0,
                },
            )
            .await;

        assert_eq!(result.data_source, DataSource::Cache);
        let movies = &result.ranked_recommendations["movie"];
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].display_name(), "Action Movie");
        assert_eq!(movies[0].ranking_score, 11.0);
    }

    #[tokio::test]
    async fn test_rank_dedup_invariant() {
        let set = movie_set(vec![
            item(serde_json::json!({"title": "Twice"})),
            item(serde_json::json!({"title": "twice"})),
            item(serde_json::json!({"title": "Once"})),
        ]);
        let engine = engine_with_sets(vec![(RecommendationType::Movie, set, None)]);

        let result = engine.rank("u1", RankingFilters::default()).await;

        for items in result.ranked_recommendations.values() {
            let mut seen = std::collections::HashSet::new();
            for item in items {
                assert!(seen.insert(item.display_name().to_lowercase()));
            }
        }
        assert_eq!(result.metadata.total_results, 2);
    }

    #[tokio::test]
    async fn test_rank_limit_invariant() {
        let items = (0..12)
            .map(|n| item(serde_json::json!({"title": format!("Movie {}", n)})))
            .collect();
        let engine = engine_with_sets(vec![(RecommendationType::Movie, movie_set(items), None)]);

        let result = engine.rank("u1", RankingFilters::default()).await;

        for items in result.ranked_recommendations.values() {
            assert!(items.len() <= 5);
        }
        assert_eq!(result.processing_info.raw_count, 12);
        assert_eq!(result.processing_info.final_count, 5);
    }

    #[tokio::test]
    async fn test_rank_drops_unknown_categories() {
        let mut recommendations = HashMap::new();
        recommendations.insert(
            "podcast".to_string(),
            vec![item(serde_json::json!({"title": "Some Show"}))],
        );
        recommendations.insert(
            "music".to_string(),
            vec![item(serde_json::json!({"title": "Some Song"}))],
        );
        let set = RawRecommendationSet::new(recommendations);
        let engine = engine_with_sets(vec![(RecommendationType::Music, set, None)]);

        let result = engine.rank("u1", RankingFilters::default()).await;

        assert!(!result.ranked_recommendations.contains_key("podcast"));
        assert!(result.ranked_recommendations.contains_key("music"));
    }

    #[tokio::test]
    async fn test_rank_falls_back_to_dummy_data() {
        let mut store = MockCacheStore::new();
        store.expect_get().returning(|_| Ok(None));
        let engine = RankingEngine::new(Arc::new(store));

        let result = engine.rank("nobody", RankingFilters::default()).await;

        assert_eq!(result.data_source, DataSource::DummyData);
        assert!(result.metadata.total_results > 0);
        assert_eq!(
            result.metadata.highest_scored_category.as_deref(),
            Some("place")
        );
    }

    #[tokio::test]
    async fn test_rank_converts_cache_errors_to_dummy_data() {
        let mut store = MockCacheStore::new();
        store.expect_get().returning(|_| {
            Err(crate::error::AppError::Internal(
                "connection refused".to_string(),
            ))
        });
        let engine = RankingEngine::new(Arc::new(store));

        let result = engine.rank("u1", RankingFilters::default()).await;

        assert_eq!(result.data_source, DataSource::DummyData);
        assert!(result.metadata.total_results > 0);
    }

    #[tokio::test]
    async fn test_metadata_averages() {
        let mut recommendations = HashMap::new();
        recommendations.insert(
            "movie".to_string(),
            vec![
                item(serde_json::json!({"title": "A", "ranking_score": 4.0})),
                item(serde_json::json!({"title": "B", "ranking_score": 2.0})),
            ],
        );
        let metadata = calculate_metadata(&recommendations, None);

        assert_eq!(metadata.total_results, 2);
        assert_eq!(metadata.average_scores["movie"], 3.0);
        assert_eq!(metadata.highest_scored_category.as_deref(), Some("movie"));
    }

    #[test]
    fn test_metadata_empty_category_averages_zero() {
        let mut recommendations = HashMap::new();
        recommendations.insert("music".to_string(), Vec::<RecommendationItem>::new());
        let metadata = calculate_metadata(&recommendations, None);

        assert_eq!(metadata.average_scores["music"], 0.0);
        assert_eq!(metadata.total_results, 0);
    }
}
