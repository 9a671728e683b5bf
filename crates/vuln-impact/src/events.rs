use std::collections::{HashMap, HashSet};
use std::fmt;

use vuln_graph::{CommitGraph, CommitId, GraphError};

use crate::ImpactError;

/// The role a commit plays in a vulnerability's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The vulnerability is present from this commit on.
    Introduced,
    /// The vulnerability is gone at this commit; the fix carries through
    /// merges.
    Fixed,
    /// Hard ceiling: only the branches ending at a limit are analyzed, and
    /// the limit commit itself is already out.
    Limit,
    /// The final commit that still carries the vulnerability on its
    /// branch; included, unlike `Fixed`.
    LastAffected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduced => "introduced",
            Self::Fixed => "fixed",
            Self::Limit => "limit",
            Self::LastAffected => "last_affected",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four event sets accepted by the analyzer. Any set may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    pub introduced: HashSet<CommitId>,
    pub fixed: HashSet<CommitId>,
    pub limit: HashSet<CommitId>,
    pub last_affected: HashSet<CommitId>,
}

impl EventSet {
    pub fn new(
        introduced: HashSet<CommitId>,
        fixed: HashSet<CommitId>,
        limit: HashSet<CommitId>,
        last_affected: HashSet<CommitId>,
    ) -> Self {
        Self {
            introduced,
            fixed,
            limit,
            last_affected,
        }
    }

    /// Annotate `id` with `kind`.
    pub fn insert(&mut self, id: CommitId, kind: EventKind) {
        self.set_of(kind).insert(id);
    }

    pub fn is_empty(&self) -> bool {
        self.introduced.is_empty()
            && self.fixed.is_empty()
            && self.limit.is_empty()
            && self.last_affected.is_empty()
    }

    /// The annotation carried by `id`, if any. A commit that is both
    /// introduced and fixed reports `Introduced`.
    pub fn kind_of(&self, id: &CommitId) -> Option<EventKind> {
        if self.introduced.contains(id) {
            Some(EventKind::Introduced)
        } else if self.fixed.contains(id) {
            Some(EventKind::Fixed)
        } else if self.limit.contains(id) {
            Some(EventKind::Limit)
        } else if self.last_affected.contains(id) {
            Some(EventKind::LastAffected)
        } else {
            None
        }
    }

    /// A commit may carry at most one annotation. The single legal overlap
    /// is `introduced ∩ fixed`: the fix ends the incoming range while the
    /// introduction opens a fresh one at the same hash.
    pub fn check_disjoint(&self) -> Result<(), ImpactError> {
        let mut seen: HashMap<CommitId, EventKind> = HashMap::new();
        for (set, kind) in self.sets() {
            for id in set {
                if let Some(&first) = seen.get(id) {
                    if (first, kind) == (EventKind::Introduced, EventKind::Fixed) {
                        continue;
                    }
                    return Err(ImpactError::ConflictingEvents {
                        commit: *id,
                        first,
                        second: kind,
                    });
                }
                seen.insert(*id, kind);
            }
        }
        Ok(())
    }

    /// Drop annotations whose commit does not resolve in `graph`, logging
    /// each drop. Unknown ids are expected (upstream records routinely
    /// reference repositories at other states) and never fail the call.
    pub fn retain_known<G: CommitGraph + ?Sized>(
        &mut self,
        graph: &G,
    ) -> Result<(), GraphError> {
        let mut missing: Vec<(CommitId, EventKind)> = Vec::new();
        for (set, kind) in self.sets() {
            for id in set {
                if !graph.contains(id)? {
                    missing.push((*id, kind));
                }
            }
        }
        for (id, kind) in missing {
            tracing::warn!(commit = %id, event = kind.as_str(), "event references unknown commit, ignoring");
            self.set_of(kind).remove(&id);
        }
        Ok(())
    }

    fn sets(&self) -> [(&HashSet<CommitId>, EventKind); 4] {
        [
            (&self.introduced, EventKind::Introduced),
            (&self.fixed, EventKind::Fixed),
            (&self.limit, EventKind::Limit),
            (&self.last_affected, EventKind::LastAffected),
        ]
    }

    fn set_of(&mut self, kind: EventKind) -> &mut HashSet<CommitId> {
        match kind {
            EventKind::Introduced => &mut self.introduced,
            EventKind::Fixed => &mut self.fixed,
            EventKind::Limit => &mut self.limit,
            EventKind::LastAffected => &mut self.last_affected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> CommitId {
        CommitId::from_bytes(&[n; 20]).unwrap()
    }

    #[test]
    fn disjoint_sets_pass() {
        let mut events = EventSet::default();
        events.insert(id(1), EventKind::Introduced);
        events.insert(id(2), EventKind::Fixed);
        events.insert(id(3), EventKind::Limit);
        events.insert(id(4), EventKind::LastAffected);
        assert!(events.check_disjoint().is_ok());
    }

    #[test]
    fn reintroduction_overlap_is_legal() {
        let mut events = EventSet::default();
        events.insert(id(1), EventKind::Introduced);
        events.insert(id(1), EventKind::Fixed);
        assert!(events.check_disjoint().is_ok());
    }

    #[test]
    fn other_overlaps_are_conflicts() {
        let mut events = EventSet::default();
        events.insert(id(1), EventKind::Fixed);
        events.insert(id(1), EventKind::Limit);
        let err = events.check_disjoint().unwrap_err();
        assert!(matches!(
            err,
            ImpactError::ConflictingEvents {
                first: EventKind::Fixed,
                second: EventKind::Limit,
                ..
            }
        ));
    }

    #[test]
    fn kind_of_prefers_introduced() {
        let mut events = EventSet::default();
        events.insert(id(1), EventKind::Fixed);
        events.insert(id(1), EventKind::Introduced);
        assert_eq!(events.kind_of(&id(1)), Some(EventKind::Introduced));
        assert_eq!(events.kind_of(&id(2)), None);
    }
}
