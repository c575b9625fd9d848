//! Behavioral diversity admission.
//!
//! Dedup keeps identical behavior out of the whole run; this filter keeps a
//! single population from crowding onto near-identical behaviors. A
//! candidate is rejected when any existing member has the same signature
//! hash or a behavior vector closer than the configured minimum distance.

use crate::schema::{Candidate, DistanceMetric, DiversityConfig};

pub struct DiversityMaintainer {
    config: DiversityConfig,
}

impl DiversityMaintainer {
    pub fn new(config: DiversityConfig) -> Self {
        Self { config }
    }

    /// Whether `candidate` is admissible against the existing members.
    /// Members without a signature are skipped.
    pub fn is_diverse<'a>(
        &self,
        candidate: &Candidate,
        existing: impl IntoIterator<Item = &'a Candidate>,
    ) -> bool {
        let Some(signature) = &candidate.signature else {
            return true;
        };
        for other in existing {
            let Some(other_signature) = &other.signature else {
                continue;
            };
            if signature.hash == other_signature.hash {
                return false;
            }
            let distance = match self.config.metric {
                DistanceMetric::Cosine => cosine_distance(&signature.vector, &other_signature.vector),
                DistanceMetric::Hamming => {
                    hamming_distance(&signature.vector, &other_signature.vector)
                }
            };
            if distance < self.config.min_distance {
                return false;
            }
        }
        true
    }
}

/// Cosine distance in `[0, 2]`. Mismatched lengths or a NaN anywhere count
/// as maximally distant; two zero vectors count as identical.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 1.0;
    }
    if a.iter().chain(b).any(|v| v.is_nan()) {
        return 1.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return if a == b { 0.0 } else { 1.0 };
    }
    1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Fraction of positions with differing values, compared bitwise so NaN
/// entries match each other.
pub fn hamming_distance(a: &[f64], b: &[f64]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }
    let mismatches = (0..max_len)
        .filter(|&i| match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => canonical_bits(*x) != canonical_bits(*y),
            _ => true,
        })
        .count();
    mismatches as f64 / max_len as f64
}

fn canonical_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DiversityConfig, Provenance};
    use crate::search::dedup::signature_from_vector;

    fn member(id: u64, vector: Vec<f64>) -> Candidate {
        let mut candidate = Candidate::new(id, format!("src {id}"), 0, 0, None, Provenance::Generated);
        candidate.signature = Some(signature_from_vector(vector));
        candidate
    }

    fn maintainer(min_distance: f64, metric: DistanceMetric) -> DiversityMaintainer {
        DiversityMaintainer::new(DiversityConfig {
            min_distance,
            metric,
        })
    }

    #[test]
    fn test_identical_signature_rejected() {
        let maintainer = maintainer(0.0, DistanceMetric::Cosine);
        let existing = [member(1, vec![1.0, 2.0])];
        assert!(!maintainer.is_diverse(&member(2, vec![1.0, 2.0]), &existing));
    }

    #[test]
    fn test_near_vector_rejected_far_vector_accepted() {
        let maintainer = maintainer(0.1, DistanceMetric::Cosine);
        let existing = [member(1, vec![1.0, 0.0])];
        // Nearly parallel: cosine distance well under 0.1.
        assert!(!maintainer.is_diverse(&member(2, vec![1.0, 0.01]), &existing));
        // Orthogonal: distance 1.0.
        assert!(maintainer.is_diverse(&member(3, vec![0.0, 1.0]), &existing));
    }

    #[test]
    fn test_hamming_counts_differing_positions() {
        assert_eq!(hamming_distance(&[1.0, 2.0, 3.0], &[1.0, 9.0, 3.0]), 1.0 / 3.0);
        assert_eq!(hamming_distance(&[f64::NAN], &[f64::NAN]), 0.0);
        assert_eq!(hamming_distance(&[1.0], &[1.0, 2.0]), 0.5);
    }

    #[test]
    fn test_cosine_nan_is_maximally_distant() {
        assert_eq!(cosine_distance(&[f64::NAN, 1.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_unsigned_candidate_passes() {
        let maintainer = maintainer(0.5, DistanceMetric::Cosine);
        let existing = [member(1, vec![1.0])];
        let unsigned = Candidate::new(9, "x".into(), 0, 0, None, Provenance::Generated);
        assert!(maintainer.is_diverse(&unsigned, &existing));
    }
}
