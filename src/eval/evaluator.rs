//! Multi-fidelity candidate scoring.
//!
//! Cheap evaluation is a fast filter over a few small instances; full
//! evaluation re-scores survivors on more and larger instances under a
//! disjoint seed range. Both are pure functions of the config and the run
//! seed, so re-running a generation reproduces every score.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::eval::packing::{first_fit_decreasing, random_instance, Instance};
use crate::sandbox::{ExecutionOutcome, Executor, Job, WorkerRequest};
use crate::schema::{EvaluationConfig, FailureKind, ScoreMode};

/// Offset separating full-fidelity seeds from cheap-fidelity seeds so the
/// two tiers never share an instance.
const FULL_SEED_OFFSET: u64 = 10_000;

/// Result of evaluating one candidate at one fidelity.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Scored {
        score: f64,
        /// Per-instance diagnostics, attached to the candidate's metadata.
        details: serde_json::Value,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

/// Scores candidate sources at two fidelity tiers.
pub trait Evaluator: Send + Sync {
    fn cheap_eval(&self, source: &str, run_seed: u64) -> EvalOutcome;
    fn full_eval(&self, source: &str, run_seed: u64) -> EvalOutcome;
}

/// Evaluator that packs generated instances in an isolated worker and scores
/// the bin counts against a first-fit-decreasing baseline or the material
/// lower bound.
pub struct BinPackingEvaluator {
    config: EvaluationConfig,
    executor: Executor,
    entry_point: String,
}

impl BinPackingEvaluator {
    pub fn new(config: EvaluationConfig, executor: Executor) -> Self {
        Self {
            config,
            executor,
            entry_point: crate::sandbox::policy::ENTRY_POINT.to_string(),
        }
    }

    /// Deterministic instance set for one fidelity tier.
    fn instances(&self, run_seed: u64, full: bool) -> Vec<Instance> {
        let (count, (min_items, max_items), seed_base) = if full {
            (
                self.config.full_instances,
                self.config.full_items,
                run_seed.wrapping_add(FULL_SEED_OFFSET),
            )
        } else {
            (self.config.cheap_instances, self.config.cheap_items, run_seed)
        };
        let mut rng = StdRng::seed_from_u64(seed_base);
        (0..count)
            .map(|_| {
                let n_items = rng.gen_range(min_items..=max_items);
                let instance_seed = rng.gen_range(0..=u64::MAX);
                random_instance(instance_seed, n_items, self.config.capacity)
            })
            .collect()
    }

    fn evaluate(&self, source: &str, run_seed: u64, full: bool) -> EvalOutcome {
        let instances = self.instances(run_seed, full);
        let request = WorkerRequest {
            source: source.to_string(),
            entry_point: self.entry_point.clone(),
            rng_seed: run_seed,
            job: Job::Pack {
                instances: instances.clone(),
            },
        };
        let outputs = match self.executor.run(&request) {
            ExecutionOutcome::Outputs(outputs) => outputs,
            ExecutionOutcome::Failed { kind, message } => {
                return EvalOutcome::Failed { kind, message };
            }
        };
        if outputs.len() != instances.len() {
            return EvalOutcome::Failed {
                kind: FailureKind::InvalidOutput,
                message: format!(
                    "worker returned {} outputs for {} instances",
                    outputs.len(),
                    instances.len()
                ),
            };
        }

        let candidate_bins: Vec<usize> = outputs.iter().map(|&b| b as usize).collect();
        let score = match self.config.score_mode {
            ScoreMode::BinsSaved => {
                let baseline: Vec<usize> =
                    instances.iter().map(first_fit_decreasing).collect();
                baseline
                    .iter()
                    .zip(&candidate_bins)
                    .map(|(&b, &c)| b as f64 - c as f64)
                    .sum()
            }
            ScoreMode::LowerBoundGap => instances
                .iter()
                .zip(&candidate_bins)
                .map(|(inst, &c)| -(c as f64 - inst.lower_bound() as f64))
                .sum(),
        };
        let avg_bins =
            candidate_bins.iter().sum::<usize>() as f64 / candidate_bins.len() as f64;
        EvalOutcome::Scored {
            score,
            details: json!({
                "n_instances": candidate_bins.len(),
                "instance_bins": candidate_bins,
                "avg_bins": avg_bins,
            }),
        }
    }
}

impl Evaluator for BinPackingEvaluator {
    fn cheap_eval(&self, source: &str, run_seed: u64) -> EvalOutcome {
        self.evaluate(source, run_seed, false)
    }

    fn full_eval(&self, source: &str, run_seed: u64) -> EvalOutcome {
        self.evaluate(source, run_seed, true)
    }
}
