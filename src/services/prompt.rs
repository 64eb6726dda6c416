use chrono::Utc;

use crate::models::{RecommendationType, UserDataBundle};

/// Builds LLM prompts from fetched user context.
///
/// A pure component: whatever parts of the bundle are present contribute
/// their sections, and a fully empty bundle produces a reduced generic
/// prompt. Building never fails.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the recommendation prompt for one (user, type) invocation
    pub fn build(
        &self,
        bundle: &UserDataBundle,
        recommendation_type: RecommendationType,
        max_results: usize,
    ) -> String {
        if bundle.is_empty() {
            return self.build_fallback(recommendation_type, max_results);
        }

        let mut sections = Vec::new();

        sections.push(format!(
            "You are an expert recommendation system. Based on the following \
             user context, provide personalized {} recommendations in JSON \
             format, grouped by category.",
            recommendation_type
        ));

        if let Some(profile) = &bundle.profile {
            let mut lines = vec![format!("USER PROFILE:\nName: {}", profile.name)];
            if let Some(age) = profile.age {
                lines.push(format!("Age: {}", age));
            }
            if !profile.interests.is_empty() {
                lines.push(format!("Interests:\n{}", bullet_list(&profile.interests)));
            }
            sections.push(lines.join("\n"));
        }

        if let Some(location) = &bundle.location {
            let mut lines = vec!["LOCATION:".to_string()];
            if let Some(current) = &location.current_location {
                lines.push(format!("Currently in: {}", current));
            }
            if let Some(home) = &location.home_location {
                lines.push(format!("Home: {}", home));
            }
            if !location.travel_history.is_empty() {
                lines.push(format!(
                    "Recently visited:\n{}",
                    bullet_list(&location.travel_history)
                ));
            }
            sections.push(lines.join("\n"));
        }

        if let Some(interaction) = &bundle.interaction {
            let engagement = interaction.engagement_score.unwrap_or(0.5);
            sections.push(format!(
                "ENGAGEMENT:\nEngagement level: {:.2} (High if >0.7, Medium if 0.4-0.7, Low if <0.4)\nRecent interactions: {}",
                engagement,
                interaction.recent_interactions.len()
            ));
        }

        sections.push(self.instructions(max_results));

        sections.join("\n\n")
    }

    /// Reduced prompt used when every collaborator came back empty
    fn build_fallback(&self, recommendation_type: RecommendationType, max_results: usize) -> String {
        format!(
            "You are an expert recommendation system. No user context is \
             available. Provide broadly appealing {} recommendations in JSON \
             format, grouped by category.\n\n{}",
            recommendation_type,
            self.instructions(max_results)
        )
    }

    fn instructions(&self, max_results: usize) -> String {
        format!(
            "INSTRUCTIONS:\n\
             1. Provide {} recommendations per category\n\
             2. Every item needs a title or name, a description, and a genre or type\n\
             3. All fields must be filled with realistic, relevant data\n\
             Current date: {}",
            max_results,
            Utc::now().format("%Y-%m-%d")
        )
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
