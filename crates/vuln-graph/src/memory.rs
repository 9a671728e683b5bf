use std::collections::HashMap;

use bstr::{BStr, BString};

use crate::{patch_id, CommitGraph, CommitId, GraphError, PatchId};

#[derive(Debug, Clone)]
struct CommitRecord {
    parents: Vec<CommitId>,
    message: BString,
    /// Textual diff against the first parent, when the embedder supplies it.
    patch: Option<BString>,
}

/// An in-memory commit graph.
///
/// Commits inserted through [`add_commit`](Self::add_commit) must name
/// already-present parents, which makes the graph acyclic by construction.
/// Bulk loads through [`from_commits`](Self::from_commits) accept any
/// order and are verified with [`assert_acyclic`](Self::assert_acyclic).
#[derive(Debug, Default, Clone)]
pub struct InMemoryGraph {
    commits: HashMap<CommitId, CommitRecord>,
    children: HashMap<CommitId, Vec<CommitId>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one commit. Every parent must already be present.
    pub fn add_commit(
        &mut self,
        id: CommitId,
        parents: &[CommitId],
        message: impl Into<BString>,
    ) -> Result<(), GraphError> {
        if self.commits.contains_key(&id) {
            return Err(GraphError::DuplicateCommit(id));
        }
        for parent in parents {
            if !self.commits.contains_key(parent) {
                return Err(GraphError::CommitNotFound(*parent));
            }
        }
        for parent in parents {
            self.children.entry(*parent).or_default().push(id);
        }
        self.commits.insert(
            id,
            CommitRecord {
                parents: parents.to_vec(),
                message: message.into(),
                patch: None,
            },
        );
        Ok(())
    }

    /// Build a graph from `(id, parents, message)` triples in any order.
    pub fn from_commits<I>(commits: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (CommitId, Vec<CommitId>, BString)>,
    {
        let mut graph = Self::new();
        for (id, parents, message) in commits {
            if graph.commits.contains_key(&id) {
                return Err(GraphError::DuplicateCommit(id));
            }
            graph.commits.insert(
                id,
                CommitRecord {
                    parents,
                    message,
                    patch: None,
                },
            );
        }
        let mut edges: Vec<(CommitId, CommitId)> = Vec::new();
        for (id, record) in &graph.commits {
            for parent in &record.parents {
                if !graph.commits.contains_key(parent) {
                    return Err(GraphError::CommitNotFound(*parent));
                }
                edges.push((*parent, *id));
            }
        }
        for (parent, child) in edges {
            graph.children.entry(parent).or_default().push(child);
        }
        graph.assert_acyclic()?;
        Ok(graph)
    }

    /// Attach the textual patch of `id` (its diff against the first parent).
    pub fn set_patch(
        &mut self,
        id: &CommitId,
        patch: impl Into<BString>,
    ) -> Result<(), GraphError> {
        let record = self
            .commits
            .get_mut(id)
            .ok_or(GraphError::CommitNotFound(*id))?;
        record.patch = Some(patch.into());
        Ok(())
    }

    /// Message of `id`, for diagnostics.
    pub fn message(&self, id: &CommitId) -> Option<&BStr> {
        self.commits.get(id).map(|r| r.message.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Verify no parent chain loops back on itself.
    ///
    /// `add_commit` cannot create a cycle; this covers bulk loads.
    pub fn assert_acyclic(&self) -> Result<(), GraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<CommitId, Mark> = HashMap::with_capacity(self.commits.len());
        for start in self.commits.keys() {
            if marks.contains_key(start) {
                continue;
            }
            // Iterative DFS along parent edges; a commit seen again while
            // still on the stack closes a cycle.
            let mut stack = vec![(*start, 0usize)];
            marks.insert(*start, Mark::Visiting);
            while let Some((id, next_parent)) = stack.pop() {
                let parents = &self.commits[&id].parents;
                if next_parent >= parents.len() {
                    marks.insert(id, Mark::Done);
                    continue;
                }
                stack.push((id, next_parent + 1));
                let parent = parents[next_parent];
                match marks.get(&parent) {
                    Some(Mark::Visiting) => return Err(GraphError::CycleDetected(parent)),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(parent, Mark::Visiting);
                        stack.push((parent, 0));
                    }
                }
            }
        }
        Ok(())
    }

    fn record(&self, id: &CommitId) -> Result<&CommitRecord, GraphError> {
        self.commits.get(id).ok_or(GraphError::CommitNotFound(*id))
    }
}

impl CommitGraph for InMemoryGraph {
    fn tips(&self) -> Result<Vec<CommitId>, GraphError> {
        let mut tips: Vec<CommitId> = self
            .commits
            .keys()
            .filter(|id| self.children.get(id).map_or(true, Vec::is_empty))
            .copied()
            .collect();
        tips.sort_unstable();
        Ok(tips)
    }

    fn contains(&self, id: &CommitId) -> Result<bool, GraphError> {
        Ok(self.commits.contains_key(id))
    }

    fn parents(&self, id: &CommitId) -> Result<Vec<CommitId>, GraphError> {
        Ok(self.record(id)?.parents.clone())
    }

    fn children(&self, id: &CommitId) -> Result<Vec<CommitId>, GraphError> {
        self.record(id)?;
        Ok(self.children.get(id).cloned().unwrap_or_default())
    }

    fn patch_id(&self, id: &CommitId) -> Result<PatchId, GraphError> {
        let record = self.record(id)?;
        let patch = record
            .patch
            .as_ref()
            .ok_or(GraphError::MissingPatch(*id))?;
        Ok(patch_id::patch_id_of(patch))
    }
}
