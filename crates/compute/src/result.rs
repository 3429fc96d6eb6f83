use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use serde::Serialize;

use enrich_catalog::PathwayId;

/// Scores and counters for one analyzed pathway.
///
/// Both the score block and the protein counters are write-once: the first
/// write wins and later writes are rejected. This mirrors the dedup
/// guarantee of [`ResultsMap`] at the level of a single result.
#[derive(Debug)]
pub struct AnalysisResult {
    pathway: PathwayId,
    scores: RwLock<Option<Scores>>,
    counts: RwLock<Option<ProteinCounts>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Scores {
    /// Parametric enrichment p-value.
    pub par_pval: f64,
    /// Non-parametric running-sum p-value.
    pub psea_pval: f64,
    /// Consensus score in [0, 100].
    pub meta_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProteinCounts {
    /// Members identified in the dataset that fall inside the ROI.
    pub in_roi: usize,
    /// Members identified anywhere in the dataset.
    pub identified: usize,
    /// Total members of the pathway in the catalog.
    pub total: usize,
}

impl AnalysisResult {
    pub fn new(pathway: PathwayId) -> Self {
        Self {
            pathway,
            scores: RwLock::new(None),
            counts: RwLock::new(None),
        }
    }

    pub fn pathway(&self) -> &PathwayId {
        &self.pathway
    }

    /// Set the score block. Returns false if already set.
    pub fn set_scores(&self, par_pval: f64, psea_pval: f64, meta_score: f64) -> bool {
        let mut guard = self.scores.write().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return false;
        }
        *guard = Some(Scores { par_pval, psea_pval, meta_score });
        true
    }

    /// Set the protein counters. Returns false if already set.
    pub fn set_counts(&self, in_roi: usize, identified: usize, total: usize) -> bool {
        let mut guard = self.counts.write().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return false;
        }
        *guard = Some(ProteinCounts { in_roi, identified, total });
        true
    }

    pub fn scores(&self) -> Option<Scores> {
        *self.scores.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn counts(&self) -> Option<ProteinCounts> {
        *self.counts.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Concurrent, insert-only map of per-pathway results.
///
/// Workers race on discovery duplicates; `insert_if_absent` arbitrates and
/// counts the losers so the end-of-run sanity check can account for every
/// dispatched pathway.
#[derive(Debug, Default)]
pub struct ResultsMap {
    inner: RwLock<HashMap<i64, AnalysisResult>>,
    duplicates: AtomicUsize,
}

impl ResultsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result keyed by its pathway id.
    ///
    /// Returns true on first insertion; a second insertion for the same
    /// pathway is dropped and counted as a duplicate.
    pub fn insert_if_absent(&self, result: AnalysisResult) -> bool {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if map.contains_key(&result.pathway().id) {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            false
        } else {
            map.insert(result.pathway().id, result);
            true
        }
    }

    /// Whether a result for this pathway already exists.
    pub fn contains(&self, pathway: &PathwayId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&pathway.id)
    }

    /// Record a duplicate detected before scoring even started.
    pub fn note_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Run a closure over every stored result.
    pub fn for_each<F: FnMut(&AnalysisResult)>(&self, mut f: F) {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        for result in map.values() {
            f(result);
        }
    }

    /// Snapshot of scores keyed by pathway id, for reporting.
    pub fn score_snapshot(&self) -> HashMap<i64, Scores> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.iter()
            .filter_map(|(id, r)| r.scores().map(|s| (*id, s)))
            .collect()
    }
}
