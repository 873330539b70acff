pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`stages` must be a non-empty sequence of {{ duration, target }} with a positive total duration")]
    InvalidStages,

    #[error("the action catalog must contain at least one action")]
    EmptyCatalog,

    #[error("action weights must be finite, non-negative, and sum to a positive value")]
    InvalidWeights,

    #[error("think time range must satisfy min <= max")]
    InvalidThinkTime,

    #[error("`batch_size` must be a positive integer")]
    InvalidBatchSize,

    #[error("invalid threshold on `{metric}`: {reason}")]
    InvalidThreshold { metric: String, reason: String },

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
