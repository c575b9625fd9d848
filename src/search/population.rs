//! Bounded, rank-ordered candidate populations.

use std::cmp::Ordering;

use crate::schema::{Candidate, IslandSummary};

/// Compare two candidates by rank: full score preferred over cheap, higher
/// score first, ties broken by earlier generation then lower id so ranking
/// is total and reproducible.
pub fn rank_cmp(a: &Candidate, b: &Candidate) -> Ordering {
    let score_a = a.rank_score().unwrap_or(f64::NEG_INFINITY);
    let score_b = b.rank_score().unwrap_or(f64::NEG_INFINITY);
    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.generation.cmp(&b.generation))
        .then_with(|| a.id.cmp(&b.id))
}

/// A bounded population. Admission either fills free capacity or evicts the
/// current minimum when the newcomer outranks it.
#[derive(Debug, Clone)]
pub struct Population {
    capacity: usize,
    members: Vec<Candidate>,
}

impl Population {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: Vec::with_capacity(capacity),
        }
    }

    /// Admit a candidate. Returns `true` if it entered the population.
    ///
    /// Panics if the capacity invariant is already violated; that is an
    /// orchestrator bug, not a candidate failure.
    pub fn add(&mut self, candidate: Candidate) -> bool {
        assert!(
            self.members.len() <= self.capacity,
            "population exceeds capacity {}",
            self.capacity
        );
        if self.members.len() < self.capacity {
            self.members.push(candidate);
            return true;
        }
        let Some(worst) = self
            .members
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| rank_cmp(a, b))
            .map(|(i, _)| i)
        else {
            return false;
        };
        if rank_cmp(&candidate, &self.members[worst]) == Ordering::Less {
            self.members[worst] = candidate;
            true
        } else {
            false
        }
    }

    /// The `k` best members, best first.
    pub fn top_k(&self, k: usize) -> Vec<&Candidate> {
        let mut ranked: Vec<&Candidate> = self.members.iter().collect();
        ranked.sort_by(|a, b| rank_cmp(a, b));
        ranked.truncate(k);
        ranked
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.members.iter().min_by(|a, b| rank_cmp(a, b))
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Size and score summary for the generation record.
    pub fn summary(&self) -> IslandSummary {
        let scores: Vec<f64> = self.members.iter().filter_map(Candidate::rank_score).collect();
        IslandSummary {
            size: self.members.len(),
            best_score: scores.iter().copied().fold(None, |best: Option<f64>, s| {
                Some(best.map_or(s, |b| b.max(s)))
            }),
            avg_score: if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Provenance, ScoreOrFailure};

    fn scored(id: u64, generation: usize, cheap: f64) -> Candidate {
        let mut candidate =
            Candidate::new(id, format!("src {id}"), generation, 0, None, Provenance::Generated);
        candidate.cheap = Some(ScoreOrFailure::Score(cheap));
        candidate
    }

    #[test]
    fn test_add_fills_then_evicts_minimum() {
        let mut population = Population::new(2);
        assert!(population.add(scored(1, 0, 1.0)));
        assert!(population.add(scored(2, 0, 3.0)));
        // Outranks the current minimum (id 1, score 1.0).
        assert!(population.add(scored(3, 0, 2.0)));
        assert_eq!(population.len(), 2);
        let ids: Vec<u64> = population.members().iter().map(|c| c.id).collect();
        assert!(ids.contains(&2) && ids.contains(&3));
        // Worse than everything present: rejected.
        assert!(!population.add(scored(4, 0, 0.5)));
    }

    #[test]
    fn test_full_score_outranks_cheap() {
        let mut better = scored(1, 0, 1.0);
        better.full = Some(ScoreOrFailure::Score(5.0));
        let cheap_only = scored(2, 0, 10.0);
        // Full 5.0 beats cheap-only 10.0? No: rank uses the preferred score
        // value, so 10.0 still wins on magnitude.
        assert_eq!(rank_cmp(&cheap_only, &better), Ordering::Less);

        let mut population = Population::new(1);
        population.add(better);
        assert!(population.add(cheap_only));
        assert_eq!(population.best().map(|c| c.id), Some(2));
    }

    #[test]
    fn test_ties_break_by_generation_then_id() {
        let a = scored(5, 1, 2.0);
        let b = scored(3, 0, 2.0);
        assert_eq!(rank_cmp(&b, &a), Ordering::Less);
        let c = scored(4, 0, 2.0);
        assert_eq!(rank_cmp(&b, &c), Ordering::Less);
    }

    #[test]
    fn test_top_k_is_sorted_best_first() {
        let mut population = Population::new(4);
        for (id, score) in [(1, 2.0), (2, 4.0), (3, 1.0), (4, 3.0)] {
            population.add(scored(id, 0, score));
        }
        let top: Vec<u64> = population.top_k(3).iter().map(|c| c.id).collect();
        assert_eq!(top, vec![2, 4, 1]);
    }

    #[test]
    fn test_summary_ignores_unscored_members() {
        let mut population = Population::new(3);
        population.add(scored(1, 0, 2.0));
        population.add(scored(2, 0, 4.0));
        population.add(Candidate::new(3, "x".into(), 0, 0, None, Provenance::Generated));
        let summary = population.summary();
        assert_eq!(summary.size, 3);
        assert_eq!(summary.best_score, Some(4.0));
        assert_eq!(summary.avg_score, Some(3.0));
    }
}
