//! Parent-side supervision of disposable worker processes.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::sandbox::policy::WORKER_FLAG;
use crate::sandbox::protocol::{WorkerRequest, WorkerResponse};
use crate::schema::{ExecutorConfig, FailureKind};

/// How often the supervisor polls the child while waiting for it to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Result of one worker run. Infrastructure trouble and candidate
/// misbehavior both land here as `Failed`; the caller never sees a panic or
/// an `Err` from this module.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// One output per instance in the request's job.
    Outputs(Vec<f64>),
    Failed { kind: FailureKind, message: String },
}

impl ExecutionOutcome {
    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Outputs(_) => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Runs candidate batches in fresh single-use processes.
///
/// Each call spawns the current executable in worker mode, pipes one JSON
/// request in, and enforces a wall-clock deadline, killing the child on
/// expiry. On Unix an address-space rlimit is installed in the child before
/// it runs; other platforms degrade to the wall-clock limit only.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
    worker: Option<PathBuf>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }

    /// Use an explicit worker binary instead of the current executable.
    /// Test harnesses are not the worker binary, so they need this.
    pub fn with_worker(config: ExecutorConfig, worker: PathBuf) -> Self {
        Self {
            config,
            worker: Some(worker),
        }
    }

    /// Execute one request in a disposable worker.
    pub fn run(&self, request: &WorkerRequest) -> ExecutionOutcome {
        let payload = match serde_json::to_string(request) {
            Ok(payload) => payload,
            Err(err) => {
                return ExecutionOutcome::failed(
                    FailureKind::Runtime,
                    format!("request encoding failed: {err}"),
                );
            }
        };
        let exe = match &self.worker {
            Some(path) => path.clone(),
            None => match std::env::current_exe() {
                Ok(exe) => exe,
                Err(err) => {
                    return ExecutionOutcome::failed(
                        FailureKind::Runtime,
                        format!("cannot locate worker binary: {err}"),
                    );
                }
            },
        };

        let mut command = Command::new(exe);
        command
            .arg(WORKER_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        self.apply_rlimits(&mut command);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return ExecutionOutcome::failed(
                    FailureKind::Runtime,
                    format!("worker spawn failed: {err}"),
                );
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            // A worker killed by the rlimit may close the pipe early; the
            // write error is then subsumed by the exit handling below.
            if let Err(err) = stdin.write_all(payload.as_bytes()) {
                debug!("worker stdin write failed: {err}");
            }
        }

        // Drain stdout on a separate thread so a chatty child cannot
        // deadlock against a full pipe while we wait on it.
        let reader = child.stdout.take().map(|mut stdout| {
            std::thread::spawn(move || {
                let mut output = String::new();
                let _ = stdout.read_to_string(&mut output);
                output
            })
        });

        let deadline = Instant::now() + Duration::from_millis(self.config.time_limit_ms);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        break Err(());
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    warn!("worker wait failed: {err}");
                    kill_and_reap(&mut child);
                    return ExecutionOutcome::failed(
                        FailureKind::Runtime,
                        format!("worker wait failed: {err}"),
                    );
                }
            }
        };

        let Ok(status) = status else {
            kill_and_reap(&mut child);
            drop(reader);
            return ExecutionOutcome::failed(
                FailureKind::Timeout,
                format!("worker exceeded {} ms", self.config.time_limit_ms),
            );
        };

        let output = reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if output.trim().is_empty() {
            return ExecutionOutcome::failed(
                FailureKind::Runtime,
                format!("worker produced no output (exit: {status})"),
            );
        }
        match serde_json::from_str::<WorkerResponse>(&output) {
            Ok(WorkerResponse::Ok { outputs }) => ExecutionOutcome::Outputs(outputs),
            Ok(WorkerResponse::Failure { kind, message }) => {
                ExecutionOutcome::Failed { kind, message }
            }
            Err(err) => ExecutionOutcome::failed(
                FailureKind::InvalidOutput,
                format!("unparseable worker output: {err}"),
            ),
        }
    }

    #[cfg(unix)]
    fn apply_rlimits(&self, command: &mut Command) {
        use std::os::unix::process::CommandExt;
        let limit = self.config.memory_limit_bytes as libc::rlim_t;
        unsafe {
            command.pre_exec(move || {
                let rlim = libc::rlimit {
                    rlim_cur: limit,
                    rlim_max: limit,
                };
                // Best effort; a failed setrlimit still leaves the
                // wall-clock deadline in place.
                libc::setrlimit(libc::RLIMIT_AS, &rlim);
                Ok(())
            });
        }
    }

    #[cfg(not(unix))]
    fn apply_rlimits(&self, _command: &mut Command) {}
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
