//! Packsearch - Evolutionary search over bin-packing scoring heuristics.
//!
//! This crate evolves small scoring scripts that drive a greedy bin-packing
//! heuristic. Candidate code is untrusted: every evaluation runs in a fresh
//! disposable worker process with import, time, and memory limits. The
//! search loop deduplicates candidates functionally (by behavior, not text),
//! keeps islands of candidates behaviorally diverse, and reserves expensive
//! evaluation for the cheap-tier winners.
//!
//! # Architecture
//!
//! - `schema`: Configuration, candidate, and record types
//! - `lang`: The tiny scripting language candidates are written in
//! - `sandbox`: Disposable worker processes and the wire protocol
//! - `eval`: Bin-packing instances and the multi-fidelity evaluator
//! - `search`: Dedup, diversity, islands, selection, and the loop
//! - `sink`: Generation record sinks
//!
//! # Example
//!
//! ```rust,no_run
//! use packsearch::schema::SearchConfig;
//! use packsearch::search::SearchEngine;
//! use packsearch::sink::MemorySink;
//!
//! let config = SearchConfig {
//!     generations: 5,
//!     ..SearchConfig::default()
//! };
//!
//! let mut engine = SearchEngine::with_defaults(config).unwrap();
//! let mut sink = MemorySink::default();
//! engine.run(&mut sink).unwrap();
//!
//! if let Some(best) = engine.best() {
//!     println!("Best heuristic (score {:?}):\n{}", best.rank_score(), best.source);
//! }
//! ```

pub mod eval;
pub mod lang;
pub mod sandbox;
pub mod schema;
pub mod search;
pub mod sink;

// Re-export commonly used types
pub use schema::{Candidate, GenerationRecord, SearchConfig};
pub use search::{EngineError, SearchEngine};
