pub mod job;
pub mod ranking;
pub mod recommendation;
pub mod user_data;

pub use job::{JobStatus, PipelineOutcome, ResultSource, TaskStatus};
pub use ranking::{DataSource, ProcessingInfo, RankedResult, RankingFilters, RankingMetadata};
pub use recommendation::{RawRecommendationSet, RecommendationItem, RecommendationType};
pub use user_data::{InteractionData, LocationData, PromptRecord, UserDataBundle, UserProfile};
