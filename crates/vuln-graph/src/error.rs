use crate::CommitId;

/// Errors produced by commit identity and graph access operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidHex { position: usize, character: char },

    #[error("invalid commit id hex length: expected 40 or 64 characters, got {actual}")]
    InvalidHexLength { actual: usize },

    #[error("invalid commit id length: expected 20 or 32 bytes, got {actual}")]
    InvalidIdLength { actual: usize },

    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    #[error("commit already present: {0}")]
    DuplicateCommit(CommitId),

    #[error("no patch recorded for commit {0}")]
    MissingPatch(CommitId),

    #[error("commit graph contains a cycle through {0}")]
    CycleDetected(CommitId),

    #[error("graph access failed: {0}")]
    Access(#[source] Box<dyn std::error::Error + Send + Sync>),
}
