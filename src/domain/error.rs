use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad or missing webhook signature. Rejected before any state change.
    #[error("authentication: {0}")]
    Authentication(String),

    /// Unparsable body or missing required fields.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Re-fetch against the gateway API failed.
    #[error("gateway: {0}")]
    Gateway(String),

    #[error("webhook budget of {0} ms exceeded")]
    Timeout(u64),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
