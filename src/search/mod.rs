//! The evolutionary search core: dedup, diversity, islands, and the loop.

pub mod dedup;
pub mod diversity;
pub mod engine;
pub mod generate;
pub mod islands;
pub mod population;
pub mod probe;
pub mod selection;

pub use dedup::{DedupOutcome, DedupStats, Deduplicator};
pub use diversity::DiversityMaintainer;
pub use engine::{EngineError, SearchEngine};
pub use generate::{CandidateSource, TemplateSource};
pub use islands::{Island, IslandManager};
pub use population::Population;
pub use probe::{BehaviorProbe, ProbeRunner};
