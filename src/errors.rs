use thiserror::Error;

#[derive(Error, Debug)]
pub enum TenderMatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Company profile not found for company {0}")]
    ProfileNotFound(uuid::Uuid),

    #[error("Company profile is incomplete: {0}")]
    ProfileIncomplete(String),

    #[error("Company profile already exists for company {0}")]
    ProfileAlreadyExists(uuid::Uuid),

    #[error("Tender not found: {0}")]
    TenderNotFound(uuid::Uuid),

    #[error("Reference tender {0} has no embedding")]
    ReferenceNotEmbedded(uuid::Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid embedding input: {0}")]
    InvalidEmbeddingInput(String),

    #[error("Embedding upstream error: {0}")]
    EmbeddingUpstream(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("HTTP client error: {0}")]
    HttpError(String),

    #[error("Service overloaded, retry later")]
    Overloaded,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TenderMatchError {
    /// Whether a retry of the same request may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUpstream(_)
                | Self::Overloaded
                | Self::DeadlineExceeded
                | Self::Database(sqlx::Error::PoolTimedOut)
        )
    }

    /// Machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database_error",
            Self::ProfileNotFound(_) => "profile_not_found",
            Self::ProfileIncomplete(_) => "profile_incomplete",
            Self::ProfileAlreadyExists(_) => "profile_exists",
            Self::TenderNotFound(_) => "tender_not_found",
            Self::ReferenceNotEmbedded(_) => "reference_not_embedded",
            Self::Validation(_) => "validation_error",
            Self::InvalidEmbeddingInput(_) => "invalid_embedding_input",
            Self::EmbeddingUpstream(_) => "embedding_upstream",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::HttpError(_) => "http_error",
            Self::Overloaded => "overloaded",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::ConfigError(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::TomlParsing(_) => "config_parse_error",
            Self::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TenderMatchError>;
