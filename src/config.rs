use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// User Profile Service base URL
    #[serde(default = "default_profile_service_url")]
    pub profile_service_url: String,

    /// Location Information Engine base URL
    #[serde(default = "default_location_service_url")]
    pub location_service_url: String,

    /// Customer Interaction Service base URL
    #[serde(default = "default_interaction_service_url")]
    pub interaction_service_url: String,

    /// LLM prefetch service base URL
    #[serde(default = "default_llm_service_url")]
    pub llm_service_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of pipeline workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// TTL for cached recommendation sets, in seconds
    #[serde(default = "default_recommendation_ttl_secs")]
    pub recommendation_ttl_secs: u64,

    /// TTL for cached prompts, in seconds
    #[serde(default = "default_prompt_ttl_secs")]
    pub prompt_ttl_secs: u64,

    /// TTL for cached user data bundles, in seconds
    #[serde(default = "default_user_data_ttl_secs")]
    pub user_data_ttl_secs: u64,

    /// Per-attempt timeout for collaborator fetches, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Per-attempt timeout for LLM calls, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Maximum attempts per pipeline stage
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base retry delay, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Retry delay ceiling, in milliseconds
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Results requested per category from the LLM
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_profile_service_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_location_service_url() -> String {
    "http://localhost:8002".to_string()
}

fn default_interaction_service_url() -> String {
    "http://localhost:8003".to_string()
}

fn default_llm_service_url() -> String {
    "http://localhost:8004".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_worker_count() -> usize {
    4
}

fn default_recommendation_ttl_secs() -> u64 {
    86400 // 24 hours
}

fn default_prompt_ttl_secs() -> u64 {
    7200 // 2 hours
}

fn default_user_data_ttl_secs() -> u64 {
    1800 // 30 minutes
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_retry_max_delay_ms() -> u64 {
    5000
}

fn default_max_results() -> usize {
    10
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
