//! Per-generation summary records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::FailureKind;

/// Counts at each filtering stage of one generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageCounts {
    /// Candidates requested from the generator roles.
    pub generated: usize,
    /// Rejected by the deduplication engine.
    pub dedup_rejected: usize,
    /// Survivors after deduplication.
    pub after_dedup: usize,
    /// Cheap evaluations that produced a score.
    pub cheap_passed: usize,
    /// Cheap evaluations that produced a failure.
    pub cheap_failed: usize,
    /// Rejected by the diversity maintainer.
    pub diversity_rejected: usize,
    /// Full evaluations attempted (top-K).
    pub full_attempted: usize,
    /// Full evaluations that produced a score.
    pub full_passed: usize,
    /// Full evaluations that produced a failure.
    pub full_failed: usize,
    /// Candidates admitted into a population.
    pub admitted: usize,
    /// Migrants cloned between islands this generation.
    pub migrated: usize,
}

/// Score summary for one island.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IslandSummary {
    /// Current population size.
    pub size: usize,
    /// Best ranking score among members, if any member is scored.
    pub best_score: Option<f64>,
    /// Average ranking score among scored members.
    pub avg_score: Option<f64>,
}

/// Wall-clock totals for one generation, in milliseconds.
///
/// The only regeneration-variant part of a record: determinism checks
/// compare records with this block excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationTiming {
    pub generate_ms: f64,
    pub dedup_ms: f64,
    pub cheap_eval_ms: f64,
    pub full_eval_ms: f64,
    pub total_ms: f64,
}

/// Summary of one completed generation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRecord {
    /// Zero-based generation index.
    pub generation: usize,
    /// Stage counters.
    pub counts: StageCounts,
    /// Per-island summaries, indexed by island id.
    pub islands: Vec<IslandSummary>,
    /// Best ranking score across all islands.
    pub best_score: Option<f64>,
    /// Average ranking score across all scored members.
    pub avg_score: Option<f64>,
    /// Failure counts by kind, over this generation's evaluations.
    pub failures: BTreeMap<FailureKind, usize>,
    /// Wall-clock totals.
    pub timing: GenerationTiming,
}

impl GenerationRecord {
    /// Equality ignoring the timing block, for determinism checks.
    pub fn same_outcome(&self, other: &GenerationRecord) -> bool {
        self.generation == other.generation
            && self.counts == other.counts
            && self.islands == other.islands
            && self.best_score == other.best_score
            && self.avg_score == other.avg_score
            && self.failures == other.failures
    }
}
