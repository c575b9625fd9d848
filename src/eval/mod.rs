//! Bin-packing problem machinery and candidate evaluation.

pub mod evaluator;
pub mod packing;

pub use evaluator::{BinPackingEvaluator, EvalOutcome, Evaluator};
pub use packing::{
    first_fit_decreasing, pack_with_scorer, probe_fingerprint, probe_instance, random_instance,
    Instance,
};
