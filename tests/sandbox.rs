//! End-to-end worker process tests.
//!
//! These spawn the real binary in worker mode, so they live here rather
//! than in unit tests: the executor needs a worker binary, and the test
//! harness is not one.

use std::path::PathBuf;
use std::time::Instant;

use packsearch::eval::Instance;
use packsearch::sandbox::{ExecutionOutcome, Executor, Job, WorkerRequest};
use packsearch::schema::{ExecutorConfig, FailureKind};

fn worker_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_packsearch"))
}

fn executor(time_limit_ms: u64) -> Executor {
    Executor::with_worker(
        ExecutorConfig {
            time_limit_ms,
            ..ExecutorConfig::default()
        },
        worker_binary(),
    )
}

fn pack_request(source: &str) -> WorkerRequest {
    WorkerRequest {
        source: source.into(),
        entry_point: "score_bin".into(),
        rng_seed: 0,
        job: Job::Pack {
            instances: vec![Instance {
                items: vec![60, 70, 40, 30],
                capacity: 100,
            }],
        },
    }
}

#[test]
fn test_pack_batch_round_trip() {
    // Best fit pairs 60+40 and 70+30.
    let outcome = executor(5000).run(&pack_request(
        "fn score_bin(item, remaining, bin, step) { return -(remaining - item); }",
    ));
    assert_eq!(outcome, ExecutionOutcome::Outputs(vec![2.0]));
}

#[test]
fn test_infinite_loop_times_out() {
    let source = "fn score_bin(item, remaining, bin, step) {
        let x = 0;
        while x < 1 { x = x * 1; }
        return x;
    }";
    let start = Instant::now();
    let outcome = executor(500).run(&pack_request(source));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
    // Kill-and-report happens promptly after the deadline.
    assert!(start.elapsed().as_millis() < 5000);
}

#[test]
fn test_blocked_import_never_runs() {
    let source = "use net; fn score_bin(item, remaining, bin, step) { return 1.0; }";
    let outcome = executor(5000).run(&pack_request(source));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::ImportBlocked));
}

#[test]
fn test_syntax_error_reported() {
    let outcome = executor(5000).run(&pack_request("fn score_bin( {"));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Syntax));
}

#[test]
fn test_wrong_arity_reported() {
    let outcome = executor(5000).run(&pack_request("fn score_bin(a) { return a; }"));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidSignature));
}

#[test]
fn test_probe_batch_is_deterministic() {
    let instances: Vec<Instance> = (0..3)
        .map(|seed| packsearch::eval::probe_instance(seed, 100))
        .collect();
    let request = WorkerRequest {
        source: "use math;\nfn score_bin(item, remaining, bin, step) {\n    \
                 return -sqrt(remaining - item + 1.0);\n}"
            .into(),
        entry_point: "score_bin".into(),
        rng_seed: 42,
        job: Job::Probe { instances },
    };
    let executor = executor(5000);
    let first = executor.run(&request);
    let second = executor.run(&request);
    assert_eq!(first, second);
    match first {
        ExecutionOutcome::Outputs(outputs) => {
            assert_eq!(outputs.len(), 3);
            assert!(outputs.iter().all(|v| v.is_finite()));
        }
        ExecutionOutcome::Failed { kind, message } => {
            panic!("probe failed: {kind} ({message})")
        }
    }
}

#[test]
fn test_runtime_error_in_pack_fails_batch() {
    let source = "fn score_bin(item, remaining, bin, step) { return nothing; }";
    let outcome = executor(5000).run(&pack_request(source));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Runtime));
}
