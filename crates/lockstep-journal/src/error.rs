use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to encode replay log: {reason}")]
    Encode { reason: String },

    #[error("failed to decode replay log: {reason}")]
    Decode { reason: String },

    #[error("replay log integrity hash did not match")]
    IntegrityMismatch,
}

pub type JournalResult<T> = Result<T, JournalError>;
