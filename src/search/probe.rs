//! Behavior probing: characterize a candidate without the full workload.

use crate::eval::probe_instance;
use crate::sandbox::{ExecutionOutcome, Executor, Job, WorkerRequest};

/// Maps candidate source to a behavior vector, one entry per probe seed.
/// NaN entries mark seeds the candidate failed under.
pub trait BehaviorProbe: Send + Sync {
    fn behavior_vector(&self, source: &str) -> Vec<f64>;
}

/// Probes candidates through the isolated executor.
///
/// All probe seeds go to a single worker in one batch; a candidate that
/// cannot run at all (syntax error, blocked import, timeout) gets an
/// all-NaN vector so such candidates form one equivalence class.
pub struct ProbeRunner {
    executor: Executor,
    seeds: Vec<u64>,
    capacity: u32,
}

impl ProbeRunner {
    pub fn new(executor: Executor, num_seeds: usize, capacity: u32) -> Self {
        Self {
            executor,
            seeds: (0..num_seeds as u64).collect(),
            capacity,
        }
    }
}

impl BehaviorProbe for ProbeRunner {
    fn behavior_vector(&self, source: &str) -> Vec<f64> {
        let instances = self
            .seeds
            .iter()
            .map(|&seed| probe_instance(seed, self.capacity))
            .collect();
        let request = WorkerRequest {
            source: source.to_string(),
            entry_point: crate::sandbox::policy::ENTRY_POINT.to_string(),
            rng_seed: 0,
            job: Job::Probe { instances },
        };
        match self.executor.run(&request) {
            ExecutionOutcome::Outputs(outputs) if outputs.len() == self.seeds.len() => outputs,
            _ => vec![f64::NAN; self.seeds.len()],
        }
    }
}
