//! Bin-packing instances, the greedy scoring driver, and baselines.
//!
//! The greedy driver queries a candidate scoring function for every bin that
//! can hold the current item and places it in the highest-scoring one,
//! opening a new bin when nothing fits or no bin received a finite score.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of items in every behavior-probe instance.
pub const PROBE_ITEMS: usize = 15;

/// A single bin-packing problem instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Item sizes, in arrival order.
    pub items: Vec<u32>,
    /// Uniform bin capacity.
    pub capacity: u32,
}

impl Instance {
    /// Material lower bound on the number of bins: `ceil(total / capacity)`.
    pub fn lower_bound(&self) -> usize {
        let total: u64 = self.items.iter().map(|&i| u64::from(i)).sum();
        total.div_ceil(u64::from(self.capacity)) as usize
    }
}

/// Generate an evaluation instance with item sizes uniform in `1..=capacity`.
pub fn random_instance(seed: u64, num_items: usize, capacity: u32) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);
    let items = (0..num_items).map(|_| rng.gen_range(1..=capacity)).collect();
    Instance { items, capacity }
}

/// Generate a probe instance. The seed class picks the item distribution so
/// probes exercise mid-sized, small, and bimodal regimes.
pub fn probe_instance(seed: u64, capacity: u32) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);
    let items = (0..PROBE_ITEMS)
        .map(|_| match seed % 3 {
            0 => bounded(&mut rng, 10, capacity.saturating_sub(10), capacity),
            1 => bounded(&mut rng, 1, capacity / 3, capacity),
            _ => {
                let small = bounded(&mut rng, 5, 25, capacity);
                let large = bounded(&mut rng, 40, 80, capacity);
                if rng.gen_bool(0.5) { small } else { large }
            }
        })
        .collect();
    Instance { items, capacity }
}

/// Sample an item size from `lo..=hi` clamped into `1..=capacity`, so small
/// capacities still yield packable items.
fn bounded(rng: &mut StdRng, lo: u32, hi: u32, capacity: u32) -> u32 {
    let hi = hi.clamp(1, capacity.max(1));
    let lo = lo.clamp(1, hi);
    rng.gen_range(lo..=hi)
}

/// Pack an instance greedily with a candidate scorer and return the bin count.
///
/// The scorer sees `(item_size, remaining_capacity, bin_index, step)` for each
/// bin that can hold the item. Non-finite scores make a bin ineligible; scorer
/// errors abort the packing and propagate.
pub fn pack_with_scorer<E>(
    instance: &Instance,
    mut scorer: impl FnMut(f64, f64, f64, f64) -> Result<f64, E>,
) -> Result<usize, E> {
    let mut remaining: Vec<u32> = Vec::new();
    for (step, &item) in instance.items.iter().enumerate() {
        let mut best_bin = None;
        let mut best_score = f64::NEG_INFINITY;
        for (i, &room) in remaining.iter().enumerate() {
            if room >= item {
                let score = scorer(f64::from(item), f64::from(room), i as f64, step as f64)?;
                if score.is_finite() && score > best_score {
                    best_score = score;
                    best_bin = Some(i);
                }
            }
        }
        match best_bin {
            Some(i) => remaining[i] -= item,
            None => remaining.push(instance.capacity.saturating_sub(item)),
        }
    }
    Ok(remaining.len())
}

/// Replay a packing and fold every scoring decision into a scalar
/// fingerprint.
///
/// Each intermediate score is weighted by its bin position and step, the
/// chosen bin index and step are folded in directly, and the final bin count
/// enters at a coarse scale. Two heuristics that pick the same bins but score
/// them differently still get distinct fingerprints. A scorer error folds a
/// NaN for that call and the replay continues.
pub fn probe_fingerprint<E>(
    instance: &Instance,
    mut scorer: impl FnMut(f64, f64, f64, f64) -> Result<f64, E>,
) -> f64 {
    let mut fingerprint = 0.0;
    let mut remaining: Vec<u32> = vec![instance.capacity];
    for (step, &item) in instance.items.iter().enumerate() {
        let mut scores = Vec::new();
        let mut best_bin: isize = -1;
        let mut best_score = f64::NEG_INFINITY;
        for (i, &room) in remaining.iter().enumerate() {
            if room >= item {
                match scorer(f64::from(item), f64::from(room), i as f64, step as f64) {
                    Ok(score) => {
                        scores.push(score);
                        if score > best_score {
                            best_score = score;
                            best_bin = i as isize;
                        }
                    }
                    Err(_) => scores.push(f64::NAN),
                }
            }
        }
        for (idx, &s) in scores.iter().enumerate() {
            if !s.is_nan() {
                fingerprint += s * 0.1f64.powi((idx % 5) as i32) * (1.0 + step as f64 * 0.01);
            }
        }
        let chosen = if best_bin >= 0 && remaining[best_bin as usize] >= item {
            remaining[best_bin as usize] -= item;
            best_bin as usize
        } else {
            remaining.push(instance.capacity.saturating_sub(item));
            remaining.len() - 1
        };
        fingerprint += chosen as f64 * 100.0 + step as f64;
    }
    fingerprint + remaining.len() as f64 * 10000.0
}

/// First-fit-decreasing baseline: sort items descending, place each in the
/// first bin with room.
pub fn first_fit_decreasing(instance: &Instance) -> usize {
    let mut items = instance.items.clone();
    items.sort_unstable_by(|a, b| b.cmp(a));
    let mut remaining: Vec<u32> = Vec::new();
    for item in items {
        match remaining.iter_mut().find(|room| **room >= item) {
            Some(room) => *room -= item,
            None => remaining.push(instance.capacity.saturating_sub(item)),
        }
    }
    remaining.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(items: &[u32], capacity: u32) -> Instance {
        Instance {
            items: items.to_vec(),
            capacity,
        }
    }

    /// Best-fit scoring: prefer the tightest remaining space.
    fn best_fit(_item: f64, remaining: f64, _bin: f64, _step: f64) -> Result<f64, ()> {
        Ok(-remaining)
    }

    #[test]
    fn test_pack_opens_new_bin_when_nothing_fits() {
        let inst = instance(&[60, 60, 60], 100);
        assert_eq!(pack_with_scorer(&inst, best_fit).unwrap(), 3);
    }

    #[test]
    fn test_pack_best_fit_fills_tight_bins() {
        // 60+40 and 70+30 pair up exactly under best-fit.
        let inst = instance(&[60, 70, 40, 30], 100);
        assert_eq!(pack_with_scorer(&inst, best_fit).unwrap(), 2);
    }

    #[test]
    fn test_pack_non_finite_scores_open_new_bin() {
        let inst = instance(&[10, 10, 10], 100);
        let bins =
            pack_with_scorer(&inst, |_, _, _, _| Ok::<f64, ()>(f64::NAN)).unwrap();
        assert_eq!(bins, 3);
    }

    #[test]
    fn test_pack_propagates_scorer_error() {
        let inst = instance(&[10, 10], 100);
        let result = pack_with_scorer(&inst, |_, _, _, step| {
            if step > 0.0 { Err("boom") } else { Ok(1.0) }
        });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_first_fit_decreasing_baseline() {
        let inst = instance(&[30, 70, 60, 40], 100);
        assert_eq!(first_fit_decreasing(&inst), 2);
        assert_eq!(inst.lower_bound(), 2);
    }

    #[test]
    fn test_instance_generation_is_deterministic() {
        let a = random_instance(42, 20, 100);
        let b = random_instance(42, 20, 100);
        assert_eq!(a, b);
        assert!(a.items.iter().all(|&i| (1..=100).contains(&i)));
    }

    #[test]
    fn test_probe_seed_classes_differ() {
        let mid = probe_instance(3, 100);
        let small = probe_instance(4, 100);
        assert_eq!(mid.items.len(), PROBE_ITEMS);
        assert!(mid.items.iter().all(|&i| (10..=90).contains(&i)));
        assert!(small.items.iter().all(|&i| (1..=33).contains(&i)));
    }

    #[test]
    fn test_probe_instance_handles_small_capacities() {
        for seed in 0..6 {
            for capacity in [1, 2, 5, 15, 30] {
                let inst = probe_instance(seed, capacity);
                assert_eq!(inst.items.len(), PROBE_ITEMS);
                assert!(inst.items.iter().all(|&i| (1..=capacity).contains(&i)));
            }
        }
    }

    #[test]
    fn test_fingerprint_distinguishes_scorers() {
        let inst = probe_instance(1, 100);
        let a = probe_fingerprint(&inst, best_fit);
        let b = probe_fingerprint(&inst, |_, remaining, _, _| Ok::<f64, ()>(remaining));
        assert_ne!(a, b);
        assert_eq!(a, probe_fingerprint(&inst, best_fit));
    }

    #[test]
    fn test_fingerprint_folds_errors_as_nan_calls() {
        let inst = probe_instance(2, 100);
        let fp = probe_fingerprint(&inst, |_, _, _, _| Err::<f64, ()>(()));
        // All calls fail, so only bin choices and the bin count contribute.
        assert!(fp.is_finite());
    }
}
