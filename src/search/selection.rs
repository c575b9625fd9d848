//! Parent selection over a ranked population.

use rand::rngs::StdRng;
use rand::Rng;

use crate::schema::{Candidate, SelectionMethod};
use crate::search::population::rank_cmp;

/// Draw one parent from `members`. Returns `None` on an empty slice.
pub fn select<'a>(
    members: &'a [Candidate],
    method: &SelectionMethod,
    rng: &mut StdRng,
) -> Option<&'a Candidate> {
    if members.is_empty() {
        return None;
    }
    match method {
        SelectionMethod::Tournament { size } => {
            let size = (*size).max(1);
            (0..size)
                .map(|_| &members[rng.gen_range(0..members.len())])
                .min_by(|a, b| rank_cmp(a, b))
        }
        SelectionMethod::RankBased => {
            // Weight n..1 by rank, best heaviest.
            let mut ranked: Vec<&Candidate> = members.iter().collect();
            ranked.sort_by(|a, b| rank_cmp(a, b));
            let n = ranked.len();
            let total = n * (n + 1) / 2;
            let mut pick = rng.gen_range(0..total);
            for (position, candidate) in ranked.iter().enumerate() {
                let weight = n - position;
                if pick < weight {
                    return Some(candidate);
                }
                pick -= weight;
            }
            ranked.last().copied()
        }
    }
}
