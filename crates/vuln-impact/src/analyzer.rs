use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vuln_graph::{CommitGraph, CommitId};

use crate::cherry::CherryPickDetector;
use crate::events::EventSet;
use crate::walk::RangeWalker;
use crate::ImpactError;

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Treat commits whose patch-id equals a declared fix on a divergent
    /// branch as fixes.
    pub detect_cherrypicks: bool,
}

/// Cooperative cancellation for a running analysis.
///
/// Clones share one flag. Once cancelled, every running and future call
/// using the token reports [`ImpactError::Cancelled`] and returns no
/// partial result.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), ImpactError> {
        if self.is_cancelled() {
            Err(ImpactError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Outcome of an affected-range analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedCommits {
    /// Every commit whose snapshot contains the vulnerability.
    pub commits: HashSet<CommitId>,
}

/// Affected-range analysis front door.
///
/// Stateless: every call derives its result from the inputs alone, so one
/// analyzer can serve any number of concurrent callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoAnalyzer {
    config: AnalyzerConfig,
}

impl RepoAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> AnalyzerConfig {
        self.config
    }

    /// Compute the affected set for the given event commits.
    ///
    /// Unknown ids are logged and ignored. An empty `introduced` set
    /// yields an empty result; with no fixes, limits, or last_affected
    /// commits, every descendant of every introduction is affected, out
    /// to the tips.
    pub fn get_affected<G: CommitGraph + ?Sized>(
        &self,
        graph: &G,
        introduced: &HashSet<CommitId>,
        fixed: &HashSet<CommitId>,
        limit: &HashSet<CommitId>,
        last_affected: &HashSet<CommitId>,
    ) -> Result<AffectedCommits, ImpactError> {
        self.get_affected_with_cancel(
            graph,
            introduced,
            fixed,
            limit,
            last_affected,
            &CancellationToken::new(),
        )
    }

    /// [`get_affected`](Self::get_affected) with external cancellation.
    pub fn get_affected_with_cancel<G: CommitGraph + ?Sized>(
        &self,
        graph: &G,
        introduced: &HashSet<CommitId>,
        fixed: &HashSet<CommitId>,
        limit: &HashSet<CommitId>,
        last_affected: &HashSet<CommitId>,
        cancel: &CancellationToken,
    ) -> Result<AffectedCommits, ImpactError> {
        let mut events = EventSet::new(
            introduced.clone(),
            fixed.clone(),
            limit.clone(),
            last_affected.clone(),
        );
        events.check_disjoint()?;
        events.retain_known(graph)?;

        if events.introduced.is_empty() {
            tracing::debug!("no introduced commit resolves, result is empty");
            return Ok(AffectedCommits::default());
        }

        if self.config.detect_cherrypicks {
            let detector = CherryPickDetector::new(graph);
            let equivalents = detector.equivalent_fixes(&events, cancel)?;
            events.fixed.extend(equivalents);
        }

        let walker = RangeWalker::new(graph, &events, cancel)?;
        let introductions: Vec<CommitId> = events.introduced.iter().copied().collect();
        // One independent walk per introduction; the union is commutative,
        // so worker scheduling cannot change the result.
        let ranges = introductions
            .par_iter()
            .map(|i| walker.walk(i))
            .collect::<Result<Vec<_>, _>>()?;

        let mut commits = HashSet::new();
        for range in ranges {
            commits.extend(range);
        }
        Ok(AffectedCommits { commits })
    }
}
