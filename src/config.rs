use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Fixed dimension D of all stored vectors.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// "openai" or "ollama"; auto-detected from the endpoint when omitted.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,
    /// Raw descriptions are truncated to this many chars before composition.
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_candidate_floor")]
    pub candidate_floor: usize,
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Per-request deadline for /recommendations, milliseconds.
    #[serde(default = "default_recommend_deadline_ms")]
    pub recommend_deadline_ms: u64,
    #[serde(default = "default_similar_deadline_ms")]
    pub similar_deadline_ms: u64,
    /// Concurrent recommendation requests before shedding with 429.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// TTL for the lazily refreshed popularity 95th percentile, seconds.
    #[serde(default = "default_popularity_ttl_secs")]
    pub popularity_ttl_secs: u64,
    /// Scoring weights applied to profiles without their own override.
    #[serde(default)]
    pub default_scoring_weights: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Two submissions of the same (user, tender, type) inside this window
    /// count as one interaction.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: i64,
    #[serde(default = "default_record_deadline_ms")]
    pub record_deadline_ms: u64,
    /// Minimum seconds spent for a view to carry weight.
    #[serde(default = "default_min_view_seconds")]
    pub min_view_seconds: i32,
    /// Positive interactions in an unlisted category before it becomes a
    /// discovered interest.
    #[serde(default = "default_discovery_min_positives")]
    pub discovery_min_positives: i64,
    /// Dismissals of a category or region before it is blocked from
    /// discovered interests.
    #[serde(default = "default_dismissal_block_count")]
    pub dismissal_block_count: i64,
    #[serde(default = "default_max_discovered_interests")]
    pub max_discovered_interests: usize,
    /// Minimum interval between implicit profile re-embeds, seconds.
    #[serde(default = "default_reembed_min_interval_secs")]
    pub reembed_min_interval_secs: i64,
    /// Interactions since the last embed that force a re-embed.
    #[serde(default = "default_reembed_interaction_count")]
    pub reembed_interaction_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from config.toml, falling back to config.example.toml.
    pub fn load() -> crate::Result<Self> {
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            eprintln!(
                "Warning: Using config.example.toml. Create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::TenderMatchError::ConfigError(
                "No config file found. Create config.toml or config.example.toml".to_string(),
            ))
        }
    }

    /// Environment variables take precedence over file values.
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(endpoint) = std::env::var("EMBEDDING_ENDPOINT") {
            self.embeddings.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL_ID") {
            self.embeddings.model = model;
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIMENSION") {
            if let Ok(dim) = dim.parse() {
                self.embeddings.dimension = dim;
            }
        }
        if let Ok(interval) = std::env::var("REEMBED_MIN_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.feedback.reembed_min_interval_secs = secs;
            }
        }
        if let Ok(window) = std::env::var("INTERACTION_DEDUP_WINDOW") {
            if let Ok(secs) = window.parse() {
                self.feedback.dedup_window_secs = secs;
            }
        }
        if let Ok(weights) = std::env::var("DEFAULT_SCORING_WEIGHTS") {
            if let Ok(weights) = serde_json::from_str(&weights) {
                self.recommendation.default_scoring_weights = Some(weights);
            }
        }
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.embeddings.dimension == 0 {
            return Err(crate::TenderMatchError::ConfigError(
                "embeddings.dimension must be positive".to_string(),
            ));
        }
        if self.feedback.dedup_window_secs <= 0 {
            return Err(crate::TenderMatchError::ConfigError(
                "feedback.dedup_window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn max_connections(&self) -> u32 {
        self.database.max_connections
    }

    pub fn min_connections(&self) -> u32 {
        self.database.min_connections
    }

    pub fn connection_timeout(&self) -> u64 {
        self.database.connection_timeout
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    pub fn embedding_endpoint(&self) -> &str {
        &self.embeddings.endpoint
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            backtrace: false,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            candidate_floor: default_candidate_floor(),
            candidate_multiplier: default_candidate_multiplier(),
            recommend_deadline_ms: default_recommend_deadline_ms(),
            similar_deadline_ms: default_similar_deadline_ms(),
            max_inflight: default_max_inflight(),
            popularity_ttl_secs: default_popularity_ttl_secs(),
            default_scoring_weights: None,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: default_dedup_window_secs(),
            record_deadline_ms: default_record_deadline_ms(),
            min_view_seconds: default_min_view_seconds(),
            discovery_min_positives: default_discovery_min_positives(),
            dismissal_block_count: default_dismissal_block_count(),
            max_discovered_interests: default_max_discovered_interests(),
            reembed_min_interval_secs: default_reembed_min_interval_secs(),
            reembed_interaction_count: default_reembed_interaction_count(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: false,
        }
    }
}

pub(crate) fn default_max_connections() -> u32 {
    20
}

pub(crate) fn default_min_connections() -> u32 {
    5
}

pub(crate) fn default_connection_timeout() -> u64 {
    30
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_embedding_dimension() -> usize {
    384
}

pub(crate) fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

pub(crate) fn default_embed_batch_size() -> usize {
    100
}

pub(crate) fn default_max_description_chars() -> usize {
    2000
}

pub(crate) fn default_cache_max_entries() -> usize {
    10_000
}

pub(crate) fn default_candidate_floor() -> usize {
    200
}

pub(crate) fn default_candidate_multiplier() -> usize {
    10
}

pub(crate) fn default_recommend_deadline_ms() -> u64 {
    2000
}

pub(crate) fn default_similar_deadline_ms() -> u64 {
    1000
}

pub(crate) fn default_max_inflight() -> usize {
    64
}

pub(crate) fn default_popularity_ttl_secs() -> u64 {
    300
}

pub(crate) fn default_dedup_window_secs() -> i64 {
    10
}

pub(crate) fn default_record_deadline_ms() -> u64 {
    500
}

pub(crate) fn default_min_view_seconds() -> i32 {
    5
}

pub(crate) fn default_discovery_min_positives() -> i64 {
    3
}

pub(crate) fn default_dismissal_block_count() -> i64 {
    3
}

pub(crate) fn default_max_discovered_interests() -> usize {
    10
}

pub(crate) fn default_reembed_min_interval_secs() -> i64 {
    3600
}

pub(crate) fn default_reembed_interaction_count() -> i32 {
    25
}

pub(crate) fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}
