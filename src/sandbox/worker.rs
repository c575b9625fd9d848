//! Child-process side of candidate execution.
//!
//! The worker reads one [`WorkerRequest`] from stdin, runs the whole batch
//! inside its own process lifetime, writes one [`WorkerResponse`] to stdout,
//! and exits. Every kind of candidate misbehavior is converted into a
//! response; the worker itself only errors on broken plumbing.

use std::io::{Read, Write};

use crate::eval::{pack_with_scorer, probe_fingerprint};
use crate::lang::{Interpreter, LangError, Program};
use crate::sandbox::policy;
use crate::sandbox::protocol::{Job, WorkerRequest, WorkerResponse};
use crate::schema::FailureKind;

/// Entry point for worker mode. Returns the process exit code.
pub fn run_worker() -> i32 {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        return 2;
    }
    let response = match serde_json::from_str::<WorkerRequest>(&input) {
        Ok(request) => execute(&request),
        Err(err) => failure(FailureKind::InvalidOutput, &format!("bad request: {err}")),
    };
    let Ok(json) = serde_json::to_string(&response) else {
        return 2;
    };
    let mut stdout = std::io::stdout();
    if stdout.write_all(json.as_bytes()).is_err() || stdout.flush().is_err() {
        return 2;
    }
    0
}

/// Run a request end to end, mapping every candidate problem to a response.
pub fn execute(request: &WorkerRequest) -> WorkerResponse {
    let program = match crate::lang::parse(&request.source) {
        Ok(program) => program,
        Err(LangError::Syntax { line, message }) => {
            return failure(
                FailureKind::Syntax,
                &format!("line {line}: {message}"),
            );
        }
        Err(LangError::Runtime { message }) => {
            return failure(FailureKind::Runtime, &message);
        }
    };

    if let Some(module) = policy::blocked_import(&program) {
        return failure(
            FailureKind::ImportBlocked,
            &format!("import '{module}' is not allowed"),
        );
    }

    match program.function(&request.entry_point) {
        Some(entry) if entry.params.len() == policy::ENTRY_ARITY => {}
        Some(entry) => {
            return failure(
                FailureKind::InvalidSignature,
                &format!(
                    "'{}' takes {} parameters, expected {}",
                    request.entry_point,
                    entry.params.len(),
                    policy::ENTRY_ARITY
                ),
            );
        }
        None => {
            return failure(
                FailureKind::InvalidSignature,
                &format!("no function named '{}'", request.entry_point),
            );
        }
    }

    match &request.job {
        Job::Pack { instances } => pack_batch(&program, request, instances),
        Job::Probe { instances } => probe_batch(&program, request, instances),
    }
}

fn pack_batch(
    program: &Program,
    request: &WorkerRequest,
    instances: &[crate::eval::Instance],
) -> WorkerResponse {
    let mut interp = Interpreter::new(program, request.rng_seed);
    let mut outputs = Vec::with_capacity(instances.len());
    for (i, instance) in instances.iter().enumerate() {
        interp.reseed(request.rng_seed.wrapping_add(i as u64));
        let bins = pack_with_scorer(instance, |item, room, bin, step| {
            interp.call(&request.entry_point, &[item, room, bin, step])
        });
        match bins {
            Ok(count) => outputs.push(count as f64),
            Err(LangError::Runtime { message }) => {
                return failure(FailureKind::Runtime, &message);
            }
            Err(err) => return failure(FailureKind::Runtime, &err.to_string()),
        }
    }
    WorkerResponse::Ok { outputs }
}

fn probe_batch(
    program: &Program,
    request: &WorkerRequest,
    instances: &[crate::eval::Instance],
) -> WorkerResponse {
    let mut interp = Interpreter::new(program, request.rng_seed);
    let outputs = instances
        .iter()
        .enumerate()
        .map(|(i, instance)| {
            interp.reseed(request.rng_seed.wrapping_add(i as u64));
            probe_fingerprint(instance, |item, room, bin, step| {
                interp.call(&request.entry_point, &[item, room, bin, step])
            })
        })
        .collect();
    WorkerResponse::Ok { outputs }
}

fn failure(kind: FailureKind, message: &str) -> WorkerResponse {
    WorkerResponse::Failure {
        kind,
        message: policy::truncate_message(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Instance;

    fn request(source: &str, job: Job) -> WorkerRequest {
        WorkerRequest {
            source: source.into(),
            entry_point: policy::ENTRY_POINT.into(),
            rng_seed: 0,
            job,
        }
    }

    fn pack_job() -> Job {
        Job::Pack {
            instances: vec![Instance {
                items: vec![60, 70, 40, 30],
                capacity: 100,
            }],
        }
    }

    fn expect_failure(response: WorkerResponse) -> FailureKind {
        match response {
            WorkerResponse::Failure { kind, .. } => kind,
            WorkerResponse::Ok { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_pack_batch_counts_bins() {
        let source = "fn score_bin(a, b, c, d) { return -b; }";
        let response = execute(&request(source, pack_job()));
        match response {
            WorkerResponse::Ok { outputs } => assert_eq!(outputs, vec![2.0]),
            WorkerResponse::Failure { .. } => panic!("expected ok"),
        }
    }

    #[test]
    fn test_syntax_error_reported() {
        let kind = expect_failure(execute(&request("fn score_bin(", pack_job())));
        assert_eq!(kind, FailureKind::Syntax);
    }

    #[test]
    fn test_blocked_import_reported() {
        let source = "use filesystem; fn score_bin(a, b, c, d) { return a; }";
        let kind = expect_failure(execute(&request(source, pack_job())));
        assert_eq!(kind, FailureKind::ImportBlocked);
    }

    #[test]
    fn test_wrong_arity_reported() {
        let source = "fn score_bin(a, b) { return a; }";
        let kind = expect_failure(execute(&request(source, pack_job())));
        assert_eq!(kind, FailureKind::InvalidSignature);
    }

    #[test]
    fn test_missing_entry_point_reported() {
        let source = "fn helper(a) { return a; }";
        let kind = expect_failure(execute(&request(source, pack_job())));
        assert_eq!(kind, FailureKind::InvalidSignature);
    }

    #[test]
    fn test_pack_runtime_error_fails_batch() {
        let source = "fn score_bin(a, b, c, d) { return missing; }";
        let kind = expect_failure(execute(&request(source, pack_job())));
        assert_eq!(kind, FailureKind::Runtime);
    }

    #[test]
    fn test_probe_runtime_error_folds_without_failing() {
        let source = "fn score_bin(a, b, c, d) { return missing; }";
        let job = Job::Probe {
            instances: vec![Instance {
                items: vec![30, 40],
                capacity: 100,
            }],
        };
        match execute(&request(source, job)) {
            WorkerResponse::Ok { outputs } => {
                assert_eq!(outputs.len(), 1);
                assert!(outputs[0].is_finite());
            }
            WorkerResponse::Failure { .. } => panic!("expected ok with folded output"),
        }
    }
}
