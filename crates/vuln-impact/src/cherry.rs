//! Cherry-pick detection by patch identity.
//!
//! A fix that was cherry-picked onto a release branch lands there as a
//! different commit with the same patch-id. Treating such commits as
//! additional fixes cuts those branches at the right place.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rayon::prelude::*;
use vuln_graph::{CommitGraph, CommitId, GraphError, PatchId};

use crate::analyzer::CancellationToken;
use crate::events::EventSet;
use crate::walk::{ancestors_or_self, descendants_or_self};
use crate::ImpactError;

pub(crate) struct CherryPickDetector<'a, G: CommitGraph + ?Sized> {
    graph: &'a G,
    /// Patch-id per commit, filled under the lock so each key is computed
    /// at most once even with the scan running on rayon.
    cache: Mutex<HashMap<CommitId, PatchId>>,
}

impl<'a, G: CommitGraph + ?Sized> CherryPickDetector<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn patch_id(&self, id: &CommitId) -> Result<PatchId, GraphError> {
        // Cached values are pure; a poisoned lock is still usable.
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pid) = cache.get(id) {
            return Ok(*pid);
        }
        let pid = self.graph.patch_id(id)?;
        cache.insert(*id, pid);
        Ok(pid)
    }

    /// Commits that apply the same patch as a declared fix, found on a
    /// branch that does not contain that fix. Only descendants of the
    /// introductions are scanned; nothing else can change the result.
    pub fn equivalent_fixes(
        &self,
        events: &EventSet,
        cancel: &CancellationToken,
    ) -> Result<HashSet<CommitId>, ImpactError> {
        if events.fixed.is_empty() || events.introduced.is_empty() {
            return Ok(HashSet::new());
        }

        let mut fix_patches: HashMap<PatchId, Vec<CommitId>> = HashMap::new();
        for fix in &events.fixed {
            fix_patches
                .entry(self.patch_id(fix)?)
                .or_default()
                .push(*fix);
        }

        // Everything related to a fix by ancestry, in either direction.
        // Matches inside this region sit on the fix's own branch and must
        // not self-heal it.
        let mut same_branch: HashMap<CommitId, HashSet<CommitId>> = HashMap::new();
        for fix in &events.fixed {
            let mut related = ancestors_or_self(self.graph, fix, cancel)?;
            related.extend(descendants_or_self(
                self.graph,
                std::slice::from_ref(fix),
                cancel,
            )?);
            same_branch.insert(*fix, related);
        }

        let introduced: Vec<CommitId> = events.introduced.iter().copied().collect();
        let candidates: Vec<CommitId> = descendants_or_self(self.graph, &introduced, cancel)?
            .into_iter()
            .filter(|c| !events.fixed.contains(c))
            .collect();

        let matches = candidates
            .par_iter()
            .map(|candidate| -> Result<Option<CommitId>, ImpactError> {
                cancel.check()?;
                let pid = self.patch_id(candidate)?;
                let fixes = match fix_patches.get(&pid) {
                    Some(fixes) => fixes,
                    None => return Ok(None),
                };
                let cross_branch = fixes
                    .iter()
                    .any(|fix| !same_branch[fix].contains(candidate));
                Ok(cross_branch.then_some(*candidate))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let found: HashSet<CommitId> = matches.into_iter().flatten().collect();
        for id in &found {
            tracing::debug!(
                commit = %id,
                "patch matches a declared fix on another branch, treating as fixed"
            );
        }
        Ok(found)
    }
}
