//! Affected-commit-range analysis.
//!
//! Given a commit DAG (read through [`vuln_graph::CommitGraph`]) and event
//! annotations placed on specific commits, [`RepoAnalyzer::get_affected`]
//! computes the exact set of commits whose snapshot still contains the
//! vulnerability. Fixes end a range and carry through merges; limits
//! confine the analysis to the branches they terminate; `last_affected`
//! marks an inclusive range end. Cherry-picked fixes on divergent branches
//! can be recognized by patch identity.

mod analyzer;
mod cherry;
mod events;
mod walk;

pub use analyzer::{AffectedCommits, AnalyzerConfig, CancellationToken, RepoAnalyzer};
pub use events::{EventKind, EventSet};

use vuln_graph::{CommitId, GraphError};

/// Errors produced by affected-range analysis.
#[derive(Debug, thiserror::Error)]
pub enum ImpactError {
    #[error("analysis cancelled")]
    Cancelled,

    #[error("commit {commit} is annotated both {first} and {second}")]
    ConflictingEvents {
        commit: CommitId,
        first: EventKind,
        second: EventKind,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
