//! Configuration types for an evolutionary search run.

use serde::{Deserialize, Serialize};

fn default_generations() -> usize {
    20
}
fn default_num_islands() -> usize {
    3
}
fn default_population_size() -> usize {
    10
}
fn default_candidates_per_generation() -> usize {
    10
}
fn default_top_k() -> usize {
    3
}
fn default_temperature() -> f64 {
    1.0
}
fn default_fresh_fraction() -> f64 {
    0.1
}
fn default_refine_fraction() -> f64 {
    0.0
}
fn default_probe_seeds() -> usize {
    5
}
fn default_min_distance() -> f64 {
    0.1
}
fn default_migration_interval() -> usize {
    5
}
fn default_migration_size() -> usize {
    1
}
fn default_time_limit_ms() -> u64 {
    5_000
}
fn default_memory_limit_bytes() -> u64 {
    256 * 1024 * 1024
}
fn default_capacity() -> u32 {
    100
}
fn default_cheap_instances() -> usize {
    4
}
fn default_full_instances() -> usize {
    10
}
fn default_cheap_items() -> (usize, usize) {
    (10, 20)
}
fn default_full_items() -> (usize, usize) {
    (50, 100)
}

/// Top-level configuration for a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of generations to run.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Number of independently evolving islands.
    #[serde(default = "default_num_islands")]
    pub num_islands: usize,
    /// Per-island population capacity.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// New candidates requested per generation, assigned to islands
    /// round-robin.
    #[serde(default = "default_candidates_per_generation")]
    pub candidates_per_generation: usize,
    /// How many cheap-ranked candidates receive a full evaluation.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Parent selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Island-local generation parameters. If shorter than `num_islands`,
    /// missing entries fall back to `IslandParams::default()`.
    #[serde(default)]
    pub island_params: Vec<IslandParams>,
    /// Deduplication settings.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Behavioral diversity admission settings.
    #[serde(default)]
    pub diversity: DiversityConfig,
    /// Inter-island migration settings.
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Isolated executor limits.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Bin-packing evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Master seed for all run-level randomness.
    #[serde(default)]
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            generations: default_generations(),
            num_islands: default_num_islands(),
            population_size: default_population_size(),
            candidates_per_generation: default_candidates_per_generation(),
            top_k: default_top_k(),
            selection: SelectionMethod::default(),
            island_params: Vec::new(),
            dedup: DedupConfig::default(),
            diversity: DiversityConfig::default(),
            migration: MigrationConfig::default(),
            executor: ExecutorConfig::default(),
            evaluation: EvaluationConfig::default(),
            seed: 0,
        }
    }
}

/// Parent selection method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Rank-proportional selection.
    RankBased,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Island-local generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandParams {
    /// Sampling temperature handed to the candidate source.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Fraction of candidates generated from scratch instead of mutated.
    #[serde(default = "default_fresh_fraction")]
    pub fresh_fraction: f64,
    /// Fraction of candidates produced by refining the island's best member.
    #[serde(default = "default_refine_fraction")]
    pub refine_fraction: f64,
}

impl Default for IslandParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            fresh_fraction: default_fresh_fraction(),
            refine_fraction: default_refine_fraction(),
        }
    }
}

/// Deduplication engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Number of probe seeds used for the behavior signature.
    #[serde(default = "default_probe_seeds")]
    pub probe_seeds: usize,
    /// Whether the normalized-source prefilter is enabled.
    #[serde(default = "default_true")]
    pub source_hash: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            probe_seeds: default_probe_seeds(),
            source_hash: true,
        }
    }
}

/// Distance metric for diversity admission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Hamming,
}

/// Behavioral diversity admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityConfig {
    /// Minimum behavior-vector distance from every population member.
    #[serde(default = "default_min_distance")]
    pub min_distance: f64,
    /// Distance metric.
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            min_distance: default_min_distance(),
            metric: DistanceMetric::default(),
        }
    }
}

/// Ring migration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Generations between migrations. Zero disables migration.
    #[serde(default = "default_migration_interval")]
    pub interval: usize,
    /// Top members cloned from each island per migration.
    #[serde(default = "default_migration_size")]
    pub size: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            interval: default_migration_interval(),
            size: default_migration_size(),
        }
    }
}

/// Isolated executor limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wall-clock limit per worker process, in milliseconds.
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
    /// Best-effort address-space ceiling for the worker, in bytes.
    /// Enforced on Unix only; other platforms degrade to timeout-only.
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: default_time_limit_ms(),
            memory_limit_bytes: default_memory_limit_bytes(),
        }
    }
}

/// How a candidate's packing result is turned into a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Total bins saved relative to the first-fit-decreasing baseline.
    #[default]
    BinsSaved,
    /// Negated excess over the material lower bound (0 = provably optimal).
    LowerBoundGap,
}

/// Bin-packing evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Bin capacity shared by all generated instances.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Instances per cheap evaluation.
    #[serde(default = "default_cheap_instances")]
    pub cheap_instances: usize,
    /// Instances per full evaluation.
    #[serde(default = "default_full_instances")]
    pub full_instances: usize,
    /// Item-count bounds for cheap instances.
    #[serde(default = "default_cheap_items")]
    pub cheap_items: (usize, usize),
    /// Item-count bounds for full instances.
    #[serde(default = "default_full_items")]
    pub full_items: (usize, usize),
    /// Score mode.
    #[serde(default)]
    pub score_mode: ScoreMode,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            cheap_instances: default_cheap_instances(),
            full_instances: default_full_instances(),
            cheap_items: default_cheap_items(),
            full_items: default_full_items(),
            score_mode: ScoreMode::default(),
        }
    }
}

impl SearchConfig {
    /// Parameters for one island, falling back to defaults past the
    /// configured list.
    pub fn island_params(&self, island: usize) -> IslandParams {
        self.island_params.get(island).cloned().unwrap_or_default()
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_islands == 0 {
            return Err(ConfigError::NoIslands);
        }
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.top_k > self.candidates_per_generation {
            return Err(ConfigError::TopKTooLarge {
                top_k: self.top_k,
                batch: self.candidates_per_generation,
            });
        }
        if self.dedup.probe_seeds == 0 {
            return Err(ConfigError::NoProbeSeeds);
        }
        if self.diversity.min_distance < 0.0 {
            return Err(ConfigError::NegativeMinDistance);
        }
        if self.executor.time_limit_ms == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        if self.evaluation.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (lo, hi) in [self.evaluation.cheap_items, self.evaluation.full_items] {
            if lo == 0 || lo > hi {
                return Err(ConfigError::BadItemBounds { lo, hi });
            }
        }
        for (idx, params) in self.island_params.iter().enumerate() {
            for fraction in [params.fresh_fraction, params.refine_fraction] {
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(ConfigError::BadFraction { island: idx });
                }
            }
            if params.fresh_fraction + params.refine_fraction > 1.0 {
                return Err(ConfigError::BadFraction { island: idx });
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Island count must be non-zero")]
    NoIslands,
    #[error("Population capacity must be non-zero")]
    EmptyPopulation,
    #[error("top_k ({top_k}) exceeds candidates per generation ({batch})")]
    TopKTooLarge { top_k: usize, batch: usize },
    #[error("Probe seed count must be non-zero")]
    NoProbeSeeds,
    #[error("Diversity min_distance must be non-negative")]
    NegativeMinDistance,
    #[error("Executor time limit must be non-zero")]
    ZeroTimeLimit,
    #[error("Bin capacity must be non-zero")]
    ZeroCapacity,
    #[error("Invalid item-count bounds ({lo}, {hi})")]
    BadItemBounds { lo: usize, hi: usize },
    #[error("Island {island} has invalid generation fractions")]
    BadFraction { island: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_top_k_bound() {
        let config = SearchConfig {
            top_k: 20,
            candidates_per_generation: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TopKTooLarge { .. })
        ));
    }

    #[test]
    fn test_island_params_fallback() {
        let config = SearchConfig {
            island_params: vec![IslandParams {
                temperature: 0.5,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(config.island_params(0).temperature, 0.5);
        assert_eq!(config.island_params(2).temperature, 1.0);
    }

    #[test]
    fn test_roundtrip_json() {
        let config = SearchConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.generations, config.generations);
        assert_eq!(back.evaluation.score_mode, config.evaluation.score_mode);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{"generations": 3}"#).unwrap();
        assert_eq!(config.generations, 3);
        assert_eq!(config.num_islands, 3);
        assert_eq!(config.dedup.probe_seeds, 5);
    }
}
