//! The generation loop.
//!
//! One `step` runs a full generation to completion: generate, deduplicate,
//! cheap-evaluate, diversity-filter, full-evaluate the top-K, admit, migrate
//! on the configured interval, and emit one record. Candidate failures are
//! additive to statistics and never abort the generation; only bookkeeping
//! invariant violations (population overflow, bad island ids) are fatal.

use std::collections::BTreeMap;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde_json::json;
use thiserror::Error;

use crate::eval::{EvalOutcome, Evaluator};
use crate::schema::{
    Candidate, ConfigError, FailureKind, GenerationRecord, GenerationTiming, Provenance,
    ScoreOrFailure, SearchConfig, StageCounts,
};
use crate::search::dedup::Deduplicator;
use crate::search::diversity::DiversityMaintainer;
use crate::search::generate::CandidateSource;
use crate::search::islands::IslandManager;
use crate::search::probe::BehaviorProbe;
use crate::search::selection::select;
use crate::sink::RecordSink;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("record sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

pub struct SearchEngine {
    config: SearchConfig,
    source: Box<dyn CandidateSource>,
    evaluator: Box<dyn Evaluator>,
    dedup: Deduplicator,
    diversity: DiversityMaintainer,
    islands: IslandManager,
    rng: StdRng,
    next_id: u64,
    generation: usize,
    history: Vec<GenerationRecord>,
}

impl SearchEngine {
    /// Engine with explicit seams, for tests and embedders.
    pub fn new(
        config: SearchConfig,
        source: Box<dyn CandidateSource>,
        evaluator: Box<dyn Evaluator>,
        probe: Box<dyn BehaviorProbe>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let dedup = Deduplicator::new(probe, config.dedup.source_hash);
        let diversity = DiversityMaintainer::new(config.diversity.clone());
        let islands = IslandManager::from_config(&config);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            source,
            evaluator,
            dedup,
            diversity,
            islands,
            rng,
            next_id: 0,
            generation: 0,
            history: Vec::new(),
        })
    }

    /// Engine wired to the built-in template source and the isolated
    /// bin-packing evaluator.
    pub fn with_defaults(config: SearchConfig) -> Result<Self, EngineError> {
        let executor = crate::sandbox::Executor::new(config.executor.clone());
        let evaluator = crate::eval::BinPackingEvaluator::new(
            config.evaluation.clone(),
            executor.clone(),
        );
        let probe = crate::search::probe::ProbeRunner::new(
            executor,
            config.dedup.probe_seeds,
            config.evaluation.capacity,
        );
        Self::new(
            config,
            Box::new(crate::search::generate::TemplateSource),
            Box::new(evaluator),
            Box::new(probe),
        )
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.islands.best()
    }

    pub fn islands(&self) -> &IslandManager {
        &self.islands
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run all configured generations.
    pub fn run(&mut self, sink: &mut dyn RecordSink) -> Result<(), EngineError> {
        for _ in 0..self.config.generations {
            self.step(sink)?;
        }
        if let Some(best) = self.best() {
            info!(
                "search finished: best score {:?} (candidate {})",
                best.rank_score(),
                best.id
            );
        }
        Ok(())
    }

    /// Run one generation to completion and emit its record.
    pub fn step(&mut self, sink: &mut dyn RecordSink) -> Result<(), EngineError> {
        let generation_start = Instant::now();
        let run_seed = self.config.seed.wrapping_add(self.generation as u64);
        let mut counts = StageCounts::default();
        let mut failures: BTreeMap<FailureKind, usize> = BTreeMap::new();
        let mut timing = GenerationTiming::default();

        let stage = Instant::now();
        let batch = self.generate_batch();
        counts.generated = batch.len();
        timing.generate_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let mut survivors: Vec<Candidate> = Vec::with_capacity(batch.len());
        for mut candidate in batch {
            let outcome = self.dedup.check(&candidate.source);
            let duplicate = outcome.is_duplicate();
            candidate.signature = Some(outcome.signature());
            if duplicate {
                counts.dedup_rejected += 1;
            } else {
                survivors.push(candidate);
            }
        }
        counts.after_dedup = survivors.len();
        timing.dedup_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let evaluator = self.evaluator.as_ref();
        survivors.par_iter_mut().for_each(|candidate| {
            apply_outcome(candidate, evaluator.cheap_eval(&candidate.source, run_seed), false);
        });
        for candidate in &survivors {
            match candidate.cheap.as_ref().and_then(ScoreOrFailure::failure) {
                None => counts.cheap_passed += 1,
                Some(kind) => {
                    counts.cheap_failed += 1;
                    *failures.entry(kind).or_default() += 1;
                }
            }
        }
        timing.cheap_eval_ms = elapsed_ms(stage);

        let mut admissible: Vec<Candidate> = Vec::with_capacity(survivors.len());
        for candidate in survivors {
            if !candidate.cheap_passed() {
                continue;
            }
            let members = self.islands.island(candidate.island).population.members();
            if self.diversity.is_diverse(&candidate, members) {
                admissible.push(candidate);
            } else {
                counts.diversity_rejected += 1;
            }
        }

        let stage = Instant::now();
        admissible.sort_by(|a, b| {
            let sa = a.cheap_score().unwrap_or(f64::NEG_INFINITY);
            let sb = b.cheap_score().unwrap_or(f64::NEG_INFINITY);
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        let k = self.config.top_k.min(admissible.len());
        counts.full_attempted = k;
        admissible[..k].par_iter_mut().for_each(|candidate| {
            apply_outcome(candidate, evaluator.full_eval(&candidate.source, run_seed), true);
        });
        for candidate in &admissible[..k] {
            match candidate.full.as_ref().and_then(ScoreOrFailure::failure) {
                None => counts.full_passed += 1,
                Some(kind) => {
                    counts.full_failed += 1;
                    *failures.entry(kind).or_default() += 1;
                }
            }
        }
        timing.full_eval_ms = elapsed_ms(stage);

        // Admission is serialized per island; candidates whose full
        // evaluation failed still carry a cheap score and compete on it.
        for candidate in admissible {
            let island = candidate.island;
            let snapshot = candidate.clone();
            if self.islands.island_mut(island).population.add(candidate) {
                counts.admitted += 1;
                sink.admitted(&snapshot)?;
            }
        }

        let interval = self.config.migration.interval;
        if interval > 0 && (self.generation + 1) % interval == 0 {
            let mut next = self.next_id;
            counts.migrated = self.islands.migrate(self.config.migration.size, &mut || {
                let id = next;
                next += 1;
                id
            });
            self.next_id = next;
        }

        let scores: Vec<f64> = self
            .islands
            .iter()
            .flat_map(|island| island.population.members().iter())
            .filter_map(Candidate::rank_score)
            .collect();
        timing.total_ms = elapsed_ms(generation_start);
        let record = GenerationRecord {
            generation: self.generation,
            counts,
            islands: self.islands.summaries(),
            best_score: scores.iter().copied().fold(None, |best: Option<f64>, s| {
                Some(best.map_or(s, |b| b.max(s)))
            }),
            avg_score: if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            },
            failures,
            timing,
        };
        debug!(
            "generation {}: {} generated, {} admitted, best {:?}",
            record.generation, record.counts.generated, record.counts.admitted, record.best_score
        );
        sink.record(&record)?;
        self.history.push(record);
        self.generation += 1;
        Ok(())
    }

    /// Round-robin the generation batch across islands, mixing roles by the
    /// target island's fractions. Empty populations always generate fresh.
    fn generate_batch(&mut self) -> Vec<Candidate> {
        let total = self.config.candidates_per_generation;
        let num_islands = self.islands.len();
        let mut batch = Vec::with_capacity(total);
        for slot in 0..total {
            let island = slot % num_islands;
            let params = self.islands.island(island).params.clone();
            let position = (slot / num_islands) as f64
                / (total.div_ceil(num_islands)).max(1) as f64;
            let members = self.islands.island(island).population.members();

            let (source, parent, provenance) = if members.is_empty()
                || position < params.fresh_fraction
            {
                (
                    self.source.generate(params.temperature, &mut self.rng),
                    None,
                    Provenance::Generated,
                )
            } else if position < params.fresh_fraction + params.refine_fraction {
                match self.islands.island(island).population.best() {
                    Some(best) => (
                        self.source.refine(
                            &best.source,
                            best.rank_score().unwrap_or(0.0),
                            params.temperature,
                            &mut self.rng,
                        ),
                        Some(best.id),
                        Provenance::Refined,
                    ),
                    None => (
                        self.source.generate(params.temperature, &mut self.rng),
                        None,
                        Provenance::Generated,
                    ),
                }
            } else {
                match select(members, &self.config.selection, &mut self.rng) {
                    Some(chosen) => (
                        self.source
                            .mutate(&chosen.source, params.temperature, &mut self.rng),
                        Some(chosen.id),
                        Provenance::Mutated,
                    ),
                    None => (
                        self.source.generate(params.temperature, &mut self.rng),
                        None,
                        Provenance::Generated,
                    ),
                }
            };
            let id = self.next_id;
            self.next_id += 1;
            batch.push(Candidate::new(
                id,
                source,
                self.generation,
                island,
                parent,
                provenance,
            ));
        }
        batch
    }
}

fn apply_outcome(candidate: &mut Candidate, outcome: EvalOutcome, full: bool) {
    let (slot, details_key, failure_key) = if full {
        (&mut candidate.full, "full", "full_failure")
    } else {
        (&mut candidate.cheap, "cheap", "cheap_failure")
    };
    match outcome {
        EvalOutcome::Scored { score, details } => {
            *slot = Some(ScoreOrFailure::Score(score));
            candidate.metadata.insert(details_key.to_string(), details);
        }
        EvalOutcome::Failed { kind, message } => {
            *slot = Some(ScoreOrFailure::Failure(kind));
            candidate
                .metadata
                .insert(failure_key.to_string(), json!(message));
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}
