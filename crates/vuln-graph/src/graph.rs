use crate::{CommitId, GraphError, PatchId};

/// Read access to a repository's commit DAG.
///
/// The underlying store is opaque: implementations may wrap a real object
/// database or an in-memory fixture. Edges point from child to parent;
/// `children` is the derived reverse adjacency, which providers typically
/// memoize by walking the full history from the tips once.
///
/// All methods take `&self` and implementations must be `Sync`: walks for
/// independent introductions read the graph concurrently.
pub trait CommitGraph: Sync {
    /// Commits with no children in the observed history.
    fn tips(&self) -> Result<Vec<CommitId>, GraphError>;

    /// Whether `id` resolves in this repository.
    fn contains(&self, id: &CommitId) -> Result<bool, GraphError>;

    /// Parents of `id`, first parent first.
    fn parents(&self, id: &CommitId) -> Result<Vec<CommitId>, GraphError>;

    /// Commits that list `id` among their parents.
    fn children(&self, id: &CommitId) -> Result<Vec<CommitId>, GraphError>;

    /// Patch-id of the change `id` applies, for cherry-pick equivalence.
    ///
    /// Only called when cherry-pick detection is enabled.
    fn patch_id(&self, id: &CommitId) -> Result<PatchId, GraphError>;
}
