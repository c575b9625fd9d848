//! Schema module - Configuration, candidate, and record types for search runs.

pub(crate) mod candidate;
mod config;
mod record;

pub use candidate::*;
pub use config::*;
pub use record::*;
