//! Candidate records and their evaluation state.

use serde::{Deserialize, Serialize};

/// Failure classes attached to a candidate at a given fidelity.
///
/// Mutually exclusive with a score for the same fidelity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Candidate source failed to lex or parse.
    Syntax,
    /// Candidate imported a module outside the allow-list.
    ImportBlocked,
    /// Candidate code faulted while running, or the worker died.
    Runtime,
    /// The worker exceeded its wall-clock limit and was killed.
    Timeout,
    /// The entry point produced a non-numeric or malformed result.
    InvalidOutput,
    /// The entry point has the wrong name or arity.
    InvalidSignature,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Syntax => "syntax",
            Self::ImportBlocked => "import_blocked",
            Self::Runtime => "runtime",
            Self::Timeout => "timeout",
            Self::InvalidOutput => "invalid_output",
            Self::InvalidSignature => "invalid_signature",
        };
        f.write_str(name)
    }
}

/// Which generator role produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Fresh generation from scratch.
    Generated,
    /// Mutation of a parent's source.
    Mutated,
    /// Refinement of an existing candidate with evaluation context.
    Refined,
    /// Clone created by inter-island migration.
    Migrated,
}

/// Behavior signature: a hash over the probe fingerprint vector.
///
/// Two candidates with equal hashes are treated as functionally equivalent
/// regardless of source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorSignature {
    /// Hex digest of the canonicalized vector.
    pub hash: String,
    /// One fingerprint per probe seed; NaN marks a failed probe.
    #[serde(with = "nan_vec")]
    pub vector: Vec<f64>,
}

/// JSON has no NaN; failed-probe entries are written as `null` and read
/// back as NaN so signatures round-trip exactly.
pub(crate) mod nan_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(vector: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mapped: Vec<Option<f64>> = vector
            .iter()
            .map(|v| if v.is_finite() { Some(*v) } else { None })
            .collect();
        mapped.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let mapped = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(mapped.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// Evaluation fidelity tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    Cheap,
    Full,
}

/// Outcome of one evaluation at one fidelity: a score or a failure kind,
/// never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScoreOrFailure {
    Score(f64),
    Failure(FailureKind),
}

impl ScoreOrFailure {
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Score(value) => Some(*value),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Score(_) => None,
            Self::Failure(kind) => Some(*kind),
        }
    }
}

/// A generated scoring function plus its evaluation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique identifier within a run.
    pub id: u64,
    /// Immutable source text.
    pub source: String,
    /// Generation the candidate was created in.
    pub generation: usize,
    /// Owning island, fixed at insertion.
    pub island: usize,
    /// Parent candidate, if mutated, refined, or migrated.
    pub parent: Option<u64>,
    /// Which generator role produced it.
    pub provenance: Provenance,
    /// Behavior signature, set once by deduplication.
    pub signature: Option<BehaviorSignature>,
    /// Cheap-fidelity outcome.
    pub cheap: Option<ScoreOrFailure>,
    /// Full-fidelity outcome; only set for top-K candidates.
    pub full: Option<ScoreOrFailure>,
    /// Fidelity-specific evaluation metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    /// A fresh, unevaluated candidate.
    pub fn new(
        id: u64,
        source: String,
        generation: usize,
        island: usize,
        parent: Option<u64>,
        provenance: Provenance,
    ) -> Self {
        Self {
            id,
            source,
            generation,
            island,
            parent,
            provenance,
            signature: None,
            cheap: None,
            full: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Cheap score, if the cheap evaluation produced one.
    pub fn cheap_score(&self) -> Option<f64> {
        self.cheap.as_ref().and_then(ScoreOrFailure::score)
    }

    /// Full score, if the full evaluation produced one.
    pub fn full_score(&self) -> Option<f64> {
        self.full.as_ref().and_then(ScoreOrFailure::score)
    }

    /// Ranking score: full preferred over cheap.
    pub fn rank_score(&self) -> Option<f64> {
        self.full_score().or_else(|| self.cheap_score())
    }

    /// Failure kind from the most recent fidelity, if any.
    pub fn failure(&self) -> Option<FailureKind> {
        self.full
            .as_ref()
            .and_then(ScoreOrFailure::failure)
            .or_else(|| self.cheap.as_ref().and_then(ScoreOrFailure::failure))
    }

    /// Whether the cheap stage produced a usable score.
    pub fn cheap_passed(&self) -> bool {
        self.cheap_score().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate::new(1, "fn score_bin(a, b, c, d) { return b; }".into(), 0, 0, None, Provenance::Generated)
    }

    #[test]
    fn test_score_failure_exclusive() {
        let mut cand = candidate();
        cand.cheap = Some(ScoreOrFailure::Score(2.0));
        assert_eq!(cand.cheap_score(), Some(2.0));
        assert_eq!(cand.failure(), None);

        cand.full = Some(ScoreOrFailure::Failure(FailureKind::Timeout));
        assert_eq!(cand.full_score(), None);
        assert_eq!(cand.failure(), Some(FailureKind::Timeout));
        // Ranking falls back to the cheap score when full failed.
        assert_eq!(cand.rank_score(), Some(2.0));
    }

    #[test]
    fn test_rank_prefers_full() {
        let mut cand = candidate();
        cand.cheap = Some(ScoreOrFailure::Score(1.0));
        cand.full = Some(ScoreOrFailure::Score(3.0));
        assert_eq!(cand.rank_score(), Some(3.0));
    }

    #[test]
    fn test_candidate_roundtrip() {
        let mut cand = candidate();
        cand.signature = Some(BehaviorSignature {
            hash: "abc".into(),
            vector: vec![1.0, f64::NAN],
        });
        cand.cheap = Some(ScoreOrFailure::Score(0.5));
        let json = serde_json::to_string(&cand).unwrap();
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, cand.id);
        assert_eq!(back.cheap_score(), Some(0.5));
        let sig = back.signature.unwrap();
        assert_eq!(sig.hash, "abc");
        assert!(sig.vector[1].is_nan());
    }
}
