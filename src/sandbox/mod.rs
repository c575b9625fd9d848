//! Isolated execution of candidate code.
//!
//! Candidate scripts never run in the orchestrator's process. The parent
//! spawns its own binary in a hidden worker mode, hands it one batch over
//! stdin, and enforces wall-clock and (on Unix) address-space limits from
//! outside. A worker that dies, hangs, or prints garbage becomes a
//! [`FailureKind`](crate::schema::FailureKind) on the candidate, never an
//! orchestrator fault.

pub mod executor;
pub mod policy;
pub mod protocol;
pub mod worker;

pub use executor::{ExecutionOutcome, Executor};
pub use protocol::{Job, WorkerRequest, WorkerResponse};
