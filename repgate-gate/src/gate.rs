//! Pre-admission delay based on the host's stored reputation.
//!
//! The delay runs in a forked, privilege-dropped child so that a corrupt
//! or hostile store file can never damage the parent, which still holds
//! the credentials needed to launch the protected service. The child's
//! exit status is the only signal back, and the parent deliberately does
//! not act on it: a failed delay pass degrades to no delay, never to a
//! refused connection.

use std::path::{Path, PathBuf};

use repgate_store::{HostStore, MAX_PENALTY_SECS};

use crate::logger::Logger;
use crate::privilege::drop_privileges;
use crate::sleeper::{RealSleeper, Sleeper};
use crate::worker::{run_isolated, WorkerError, WorkerOutcome};

/// Delay applied when the privilege drop fails inside the delay worker.
///
/// An unknown penalty is treated as a moderately bad one rather than
/// letting a misconfigured host skip the tarpit entirely.
pub const ERROR_DELAY_SECS: u64 = 30;

/// Trait for the pre-admission delay stage.
pub trait DelayGate: Send + Sync {
    /// Hold the connection according to `host`'s reputation.
    fn apply(&self, host: &str, logger: &dyn Logger) -> Result<WorkerOutcome, WorkerError>;
}

/// The delay body, run under reduced privileges.
///
/// Returns the exit code for the worker process: 0 when the delay (possibly
/// zero seconds) was served, 1 when the store or the privilege drop failed.
/// The privilege-failure path still sleeps [`ERROR_DELAY_SECS`] so a broken
/// deployment does not become a fast path for attackers.
pub fn delay_job(
    host: &str,
    store_path: &Path,
    uid: u32,
    gid: u32,
    sleeper: &dyn Sleeper,
    logger: &dyn Logger,
) -> i32 {
    let _proof = match drop_privileges(uid, gid) {
        Ok(proof) => proof,
        Err(err) => {
            logger.warn(&format!(
                "privilege drop failed, delaying {ERROR_DELAY_SECS}s: {err}"
            ));
            sleeper.sleep_secs(ERROR_DELAY_SECS);
            return 1;
        }
    };

    let store = match HostStore::open_read_only(store_path) {
        Ok(store) => store,
        Err(err) => {
            logger.error(&format!("cannot open reputation store: {err}"));
            return 1;
        }
    };

    let penalty = match store.get_penalty(host) {
        Ok(penalty) => penalty,
        Err(err) => {
            logger.error(&format!("penalty lookup for {host} failed: {err}"));
            return 1;
        }
    };

    let delay = u64::from(penalty.min(MAX_PENALTY_SECS));
    if delay > 0 {
        logger.info(&format!("delaying {host} for {delay}s"));
        sleeper.sleep_secs(delay);
    }
    0
}

/// Production gate: forks a child, drops privileges there, and serves the
/// penalty with a real sleep.
#[derive(Debug, Clone)]
pub struct ForkDelayGate {
    store: PathBuf,
    uid: u32,
    gid: u32,
}

impl ForkDelayGate {
    /// Create a gate reading penalties from `store` as `uid`/`gid`.
    pub fn new(store: PathBuf, uid: u32, gid: u32) -> Self {
        Self { store, uid, gid }
    }
}

impl DelayGate for ForkDelayGate {
    fn apply(&self, host: &str, logger: &dyn Logger) -> Result<WorkerOutcome, WorkerError> {
        run_isolated(|| delay_job(host, &self.store, self.uid, self.gid, &RealSleeper, logger))
    }
}

/// Test gate that records the hosts it was asked to delay and returns a
/// preset outcome without forking or sleeping.
#[derive(Debug, Clone)]
pub struct MockDelayGate {
    outcome: WorkerOutcome,
    hosts: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockDelayGate {
    /// Gate whose delay pass always completes.
    pub fn completing() -> Self {
        Self {
            outcome: WorkerOutcome::Completed,
            hosts: Default::default(),
        }
    }

    /// Gate whose delay pass always fails.
    pub fn failing() -> Self {
        Self {
            outcome: WorkerOutcome::Failed,
            hosts: Default::default(),
        }
    }

    /// Hosts passed to `apply` so far.
    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

impl DelayGate for MockDelayGate {
    fn apply(&self, host: &str, _logger: &dyn Logger) -> Result<WorkerOutcome, WorkerError> {
        self.hosts.lock().unwrap().push(host.to_string());
        Ok(self.outcome)
    }
}
