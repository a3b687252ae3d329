use crate::checkpoint::CheckpointFormat;

/// everything that can go wrong across the training cycle.
/// recoverable variants are handled at phase boundaries by the
/// orchestrator; Internal halts the run and dumps diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ChessError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("codec mismatch: approximator expects {expected} but codec produces {actual}")]
    CodecMismatch { expected: usize, actual: usize },
    #[error("rules engine: {0}")]
    RulesEngine(String),
    #[error("action {action} is not legal in this position")]
    IllegalAction { action: usize },
    #[error("non-finite training update at batch {batch}")]
    NonFiniteUpdate { batch: usize },
    #[error("checkpoint io: {0}")]
    CheckpointIo(#[from] std::io::Error),
    #[error("checkpoint format {found:?}, expected {expected:?}; suggested backend: {backend}")]
    CheckpointFormatMismatch {
        found: CheckpointFormat,
        expected: CheckpointFormat,
        backend: &'static str,
    },
    #[error("checkpoint {id} failed validation: {reason}")]
    CheckpointValidationFailed { id: String, reason: String },
    #[error("cancelled")]
    Cancelled,
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ChessError>;
