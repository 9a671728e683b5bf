//! Per-introduction range walking.
//!
//! For one `introduced` commit the walker enumerates every descendant that
//! is still vulnerable. Exclusion works on closed regions rather than
//! single-path checks: the child-ward closure of the cut commits taking
//! part in a walk is blocked outright, which is what lets a fix heal a
//! merge it reaches from a side branch. When limits exist the walk also
//! stays inside their ancestor cones, so only the branches a limit
//! terminates are observed at all.

use std::collections::{HashMap, HashSet, VecDeque};

use vuln_graph::{CommitGraph, CommitId};

use crate::analyzer::CancellationToken;
use crate::events::EventSet;
use crate::ImpactError;

/// What one cut commit (fixed, limit, or last_affected) knows about its
/// place in the graph. Shared by every walk of one analysis.
struct EventScope {
    /// Parent-ward closure: the cut commit and everything behind it.
    ancestors: HashSet<CommitId>,
    /// No introduction anywhere behind the cut commit.
    clean_lineage: bool,
}

pub(crate) struct RangeWalker<'a, G: CommitGraph + ?Sized> {
    graph: &'a G,
    events: &'a EventSet,
    scopes: HashMap<CommitId, EventScope>,
    /// Union of the limits' strict ancestor cones; `None` when no limits.
    observed: Option<HashSet<CommitId>>,
    cancel: &'a CancellationToken,
}

impl<'a, G: CommitGraph + ?Sized> RangeWalker<'a, G> {
    pub fn new(
        graph: &'a G,
        events: &'a EventSet,
        cancel: &'a CancellationToken,
    ) -> Result<Self, ImpactError> {
        let mut scopes = HashMap::new();
        let cuts = events
            .fixed
            .iter()
            .chain(&events.limit)
            .chain(&events.last_affected);
        for id in cuts {
            if scopes.contains_key(id) {
                continue;
            }
            let ancestors = ancestors_or_self(graph, id, cancel)?;
            let clean_lineage = ancestors.is_disjoint(&events.introduced);
            scopes.insert(
                *id,
                EventScope {
                    ancestors,
                    clean_lineage,
                },
            );
        }

        let observed = if events.limit.is_empty() {
            None
        } else {
            let mut cone = HashSet::new();
            let mut queue = VecDeque::new();
            for limit in &events.limit {
                for parent in graph.parents(limit)? {
                    if cone.insert(parent) {
                        queue.push_back(parent);
                    }
                }
            }
            while let Some(id) = queue.pop_front() {
                cancel.check()?;
                for parent in graph.parents(&id)? {
                    if cone.insert(parent) {
                        queue.push_back(parent);
                    }
                }
            }
            Some(cone)
        };

        Ok(Self {
            graph,
            events,
            scopes,
            observed,
            cancel,
        })
    }

    /// Every still-vulnerable commit of the range opened at `introduced`.
    pub fn walk(&self, introduced: &CommitId) -> Result<HashSet<CommitId>, ImpactError> {
        let behind = ancestors_or_self(self.graph, introduced, self.cancel)?;
        let blocked = self.blocked_region(introduced, &behind)?;

        let mut affected = HashSet::new();
        // The introduction is a candidate even when every limit observes
        // some other branch; only its own annotations can veto it.
        if !self.events.fixed.contains(introduced) && !self.events.limit.contains(introduced) {
            affected.insert(*introduced);
        }

        // Blocked regions are descendant-closed and the observed region is
        // ancestor-closed, so pruning during the BFS loses nothing.
        let mut seen = HashSet::from([*introduced]);
        let mut queue = VecDeque::new();
        if self.in_observed(introduced) {
            queue.push_back(*introduced);
        }
        while let Some(id) = queue.pop_front() {
            self.cancel.check()?;
            for child in self.graph.children(&id)? {
                if !seen.insert(child) || blocked.contains(&child) || !self.in_observed(&child) {
                    continue;
                }
                affected.insert(child);
                queue.push_back(child);
            }
        }
        Ok(affected)
    }

    /// Child-ward closure of the cut commits taking part in this walk: a
    /// fixed or limit commit seeds its own closure, a last_affected commit
    /// seeds its children (the commit itself stays in range).
    fn blocked_region(
        &self,
        introduced: &CommitId,
        behind: &HashSet<CommitId>,
    ) -> Result<HashSet<CommitId>, ImpactError> {
        let mut blocked = HashSet::new();
        let mut queue = VecDeque::new();
        for id in self.events.fixed.iter().chain(&self.events.limit) {
            if !self.participates(id, introduced, behind) {
                continue;
            }
            if blocked.insert(*id) {
                queue.push_back(*id);
            }
        }
        for id in &self.events.last_affected {
            if !self.participates(id, introduced, behind) {
                continue;
            }
            for child in self.graph.children(id)? {
                if blocked.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        while let Some(id) = queue.pop_front() {
            self.cancel.check()?;
            for child in self.graph.children(&id)? {
                if blocked.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        Ok(blocked)
    }

    /// A cut commit takes part in the walk of `introduced` when it is not
    /// behind the introduction and either descends from it or has a clean
    /// lineage. A fix descending from a *different* introduction only
    /// terminates that range; a fix from a branch that never carried any
    /// introduction heals whatever it merges into.
    fn participates(
        &self,
        cut: &CommitId,
        introduced: &CommitId,
        behind: &HashSet<CommitId>,
    ) -> bool {
        if behind.contains(cut) {
            return false;
        }
        let scope = &self.scopes[cut];
        scope.clean_lineage || scope.ancestors.contains(introduced)
    }

    fn in_observed(&self, id: &CommitId) -> bool {
        self.observed.as_ref().map_or(true, |cone| cone.contains(id))
    }
}

/// Parent-ward closure: `start` and every commit behind it.
pub(crate) fn ancestors_or_self<G: CommitGraph + ?Sized>(
    graph: &G,
    start: &CommitId,
    cancel: &CancellationToken,
) -> Result<HashSet<CommitId>, ImpactError> {
    let mut seen = HashSet::from([*start]);
    let mut queue = VecDeque::from([*start]);
    while let Some(id) = queue.pop_front() {
        cancel.check()?;
        for parent in graph.parents(&id)? {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(seen)
}

/// Child-ward closure of `starts`.
pub(crate) fn descendants_or_self<G: CommitGraph + ?Sized>(
    graph: &G,
    starts: &[CommitId],
    cancel: &CancellationToken,
) -> Result<HashSet<CommitId>, ImpactError> {
    let mut seen: HashSet<CommitId> = starts.iter().copied().collect();
    let mut queue: VecDeque<CommitId> = starts.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        cancel.check()?;
        for child in graph.children(&id)? {
            if seen.insert(child) {
                queue.push_back(child);
            }
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vuln_graph::InMemoryGraph;

    fn id(n: u8) -> CommitId {
        CommitId::from_bytes(&[n; 20]).unwrap()
    }

    /// 0 → 1 → 2 → 3 with 4 branching off 1.
    fn branchy() -> InMemoryGraph {
        let mut graph = InMemoryGraph::new();
        graph.add_commit(id(0), &[], "0").unwrap();
        graph.add_commit(id(1), &[id(0)], "1").unwrap();
        graph.add_commit(id(2), &[id(1)], "2").unwrap();
        graph.add_commit(id(3), &[id(2)], "3").unwrap();
        graph.add_commit(id(4), &[id(1)], "4").unwrap();
        graph
    }

    #[test]
    fn ancestor_closure_includes_start() {
        let graph = branchy();
        let cancel = CancellationToken::new();
        let behind = ancestors_or_self(&graph, &id(2), &cancel).unwrap();
        assert_eq!(behind, HashSet::from([id(0), id(1), id(2)]));
    }

    #[test]
    fn descendant_closure_is_multi_source() {
        let graph = branchy();
        let cancel = CancellationToken::new();
        let ahead = descendants_or_self(&graph, &[id(2), id(4)], &cancel).unwrap();
        assert_eq!(ahead, HashSet::from([id(2), id(3), id(4)]));
    }

    #[test]
    fn walk_without_cuts_covers_all_descendants() {
        let graph = branchy();
        let cancel = CancellationToken::new();
        let mut events = EventSet::default();
        events.introduced.insert(id(1));
        let walker = RangeWalker::new(&graph, &events, &cancel).unwrap();
        let range = walker.walk(&id(1)).unwrap();
        assert_eq!(range, HashSet::from([id(1), id(2), id(3), id(4)]));
    }

    #[test]
    fn cancelled_token_aborts_the_walk() {
        let graph = branchy();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut events = EventSet::default();
        events.introduced.insert(id(1));
        let err = RangeWalker::new(&graph, &events, &cancel)
            .and_then(|w| w.walk(&id(1)))
            .unwrap_err();
        assert!(matches!(err, ImpactError::Cancelled));
    }
}
