//! Shared in-memory repository fixture for analyzer tests.
//!
//! Commits are created by symbolic label with declared parents and an
//! optional event annotation; expectations are compared by label set.
//! Every repository starts with an unannotated root commit `"A"`.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use bstr::BString;
use sha1::{Digest, Sha1};
use vuln_graph::{CommitId, InMemoryGraph};
use vuln_impact::{EventKind, EventSet, RepoAnalyzer};

pub struct TestRepository {
    graph: InMemoryGraph,
    ids: HashMap<String, CommitId>,
    events: EventSet,
}

impl TestRepository {
    pub fn new() -> Self {
        let mut repo = Self {
            graph: InMemoryGraph::new(),
            ids: HashMap::new(),
            events: EventSet::default(),
        };
        repo.add_commit("A", &[], None);
        repo
    }

    /// Create commit `label` with the given parent labels and an optional
    /// event annotation.
    pub fn add_commit(
        &mut self,
        label: &str,
        parents: &[&str],
        event: Option<EventKind>,
    ) -> CommitId {
        let parent_ids: Vec<CommitId> = parents.iter().map(|p| self.ids[*p]).collect();
        let id = commit_digest(label, &parent_ids);
        self.graph.add_commit(id, &parent_ids, label).unwrap();
        self.graph.set_patch(&id, patch_text(label)).unwrap();
        self.ids.insert(label.to_string(), id);
        if let Some(kind) = event {
            self.events.insert(id, kind);
        }
        id
    }

    /// Like [`add_commit`](Self::add_commit), but the new commit applies
    /// the same patch as `source` (a cherry-pick).
    pub fn add_cherry_pick(
        &mut self,
        label: &str,
        parents: &[&str],
        event: Option<EventKind>,
        source: &str,
    ) -> CommitId {
        let id = self.add_commit(label, parents, event);
        self.graph.set_patch(&id, patch_text(source)).unwrap();
        id
    }

    /// Annotate an id that does not exist in the repository.
    pub fn add_unknown_event(&mut self, seed: u8, kind: EventKind) -> CommitId {
        let id = CommitId::from_bytes(&[seed; 20]).unwrap();
        self.events.insert(id, kind);
        id
    }

    /// The four event sets in the order the surrounding pipeline hands
    /// them out: (introduced, fixed, last_affected, limit).
    pub fn get_ranges(
        &self,
    ) -> (
        HashSet<CommitId>,
        HashSet<CommitId>,
        HashSet<CommitId>,
        HashSet<CommitId>,
    ) {
        (
            self.events.introduced.clone(),
            self.events.fixed.clone(),
            self.events.last_affected.clone(),
            self.events.limit.clone(),
        )
    }

    /// Translate symbolic labels into commit ids.
    pub fn get_commit_ids(&self, labels: &[&str]) -> HashSet<CommitId> {
        labels.iter().map(|l| self.ids[*l]).collect()
    }

    /// Reverse lookup for diagnostics: commit messages of `ids`, sorted.
    pub fn get_message_by_commits_id(&self, ids: &HashSet<CommitId>) -> Vec<String> {
        let mut labels: Vec<String> = ids
            .iter()
            .map(|id| {
                self.graph
                    .message(id)
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect();
        labels.sort();
        labels
    }

    pub fn id_of(&self, label: &str) -> CommitId {
        self.ids[label]
    }

    pub fn graph(&self) -> &InMemoryGraph {
        &self.graph
    }
}

/// Run the analyzer over the repository's events and compare by label set.
pub fn assert_affected(repo: &TestRepository, analyzer: &RepoAnalyzer, expected: &[&str]) {
    let (introduced, fixed, last_affected, limit) = repo.get_ranges();
    let result = analyzer
        .get_affected(repo.graph(), &introduced, &fixed, &limit, &last_affected)
        .unwrap();
    let expected_ids = repo.get_commit_ids(expected);
    assert_eq!(
        result.commits,
        expected_ids,
        "expected {:?}, got {:?}",
        expected,
        repo.get_message_by_commits_id(&result.commits),
    );
}

/// Deterministic fake commit hash from the label and parent ids.
fn commit_digest(label: &str, parents: &[CommitId]) -> CommitId {
    let mut hasher = Sha1::new();
    hasher.update(b"commit ");
    hasher.update(label.as_bytes());
    hasher.update(b"\0");
    for parent in parents {
        hasher.update(parent.as_bytes());
    }
    CommitId::from_bytes(&hasher.finalize()).unwrap()
}

/// A one-hunk diff unique to the label; a cherry-pick reuses its source's.
fn patch_text(label: &str) -> BString {
    format!(
        "diff --git a/src/{label}.rs b/src/{label}.rs\n\
         index 0000000..1111111 100644\n\
         --- a/src/{label}.rs\n\
         +++ b/src/{label}.rs\n\
         @@ -1,2 +1,3 @@\n \
         fn existing() {{}}\n\
         +fn change_{label}() {{}}\n"
    )
    .into()
}
