//! Wire types exchanged between the parent process and a worker.
//!
//! One request goes down the worker's stdin, one response comes back on its
//! stdout, both as single JSON documents. The worker exits after replying.

use serde::{Deserialize, Serialize};

use crate::eval::Instance;
use crate::schema::candidate::nan_vec;
use crate::schema::FailureKind;

/// What the worker should do with the candidate source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    /// Pack each instance and report the bin count per instance.
    Pack { instances: Vec<Instance> },
    /// Replay each instance and report the behavior fingerprint per instance.
    Probe { instances: Vec<Instance> },
}

/// A complete unit of work for one disposable worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Candidate script source.
    pub source: String,
    /// Name of the scoring function to call.
    pub entry_point: String,
    /// Base seed for the script's `random` module; instance index is added
    /// so each instance sees a distinct stream.
    pub rng_seed: u64,
    pub job: Job,
}

/// The worker's reply: one output per instance, or a single failure covering
/// the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResponse {
    Ok {
        /// Probe outputs may be NaN for failed seeds; encoded as `null`.
        #[serde(with = "nan_vec")]
        outputs: Vec<f64>,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trips() {
        let request = WorkerRequest {
            source: "fn score_bin(a, b, c, d) { return a; }".into(),
            entry_point: "score_bin".into(),
            rng_seed: 9,
            job: Job::Pack {
                instances: vec![Instance {
                    items: vec![10, 20],
                    capacity: 100,
                }],
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"pack\""));
        let back: WorkerRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rng_seed, 9);
    }

    #[test]
    fn test_probe_response_encodes_nan_as_null() {
        let response = WorkerResponse::Ok {
            outputs: vec![1.5, f64::NAN],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("null"));
        let back: WorkerResponse = serde_json::from_str(&json).unwrap();
        match back {
            WorkerResponse::Ok { outputs } => {
                assert_eq!(outputs[0], 1.5);
                assert!(outputs[1].is_nan());
            }
            WorkerResponse::Failure { .. } => panic!("expected ok"),
        }
    }

    #[test]
    fn test_failure_response_shape() {
        let response = WorkerResponse::Failure {
            kind: FailureKind::ImportBlocked,
            message: "import 'os' is not allowed".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"failure\""));
        assert!(json.contains("import_blocked"));
    }
}
