use thiserror::Error;
use triage_store::StoreError;

pub type Result<T> = std::result::Result<T, GroupingError>;

#[derive(Error, Debug)]
pub enum GroupingError {
    /// A persistence call failed. Grouping entry points catch this, log it,
    /// and report "not grouped"; lifecycle operations surface it to the caller.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The embedding collaborator could not produce a vector.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Caller contract violation, e.g. a split or move naming a message that
    /// is not currently a member of the stated group. Reported distinctly
    /// from storage failures so stale manual actions are identifiable.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
