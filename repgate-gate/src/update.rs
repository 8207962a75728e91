//! Recording the verdict back into the reputation store.
//!
//! The verdict write is the last thing the gate does; by then the service
//! has exited and the elevated identity has no remaining purpose, so the
//! main process drops privileges in place rather than forking again.
//! A failed drop degrades to "verdict not recorded" instead of refusing
//! the already-served connection retroactively.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use repgate_store::{HostStore, StoreError};

use crate::classify::Verdict;
use crate::logger::Logger;
use crate::privilege::drop_privileges;
use crate::worker::WorkerOutcome;

/// Trait for persisting a connection verdict.
pub trait ReputationSink: Send + Sync {
    /// Record `verdict` against `host`.
    ///
    /// `Ok(Failed)` means the write was skipped for a survivable reason;
    /// `Err` means the store itself rejected the write.
    fn record(
        &self,
        host: &str,
        verdict: Verdict,
        logger: &dyn Logger,
    ) -> Result<WorkerOutcome, StoreError>;
}

/// Production sink: drops privileges in the calling process, then applies
/// the verdict read-write.
#[derive(Debug, Clone)]
pub struct PrivilegedUpdater {
    store: PathBuf,
    uid: u32,
    gid: u32,
}

impl PrivilegedUpdater {
    /// Create an updater writing to `store` as `uid`/`gid`.
    pub fn new(store: PathBuf, uid: u32, gid: u32) -> Self {
        Self { store, uid, gid }
    }

    fn apply(&self, store: &HostStore, host: &str, verdict: Verdict) -> Result<(), StoreError> {
        match verdict {
            Verdict::Suspicious => store.record_suspicious(host),
            Verdict::Benign => store.record_benign(host),
        }
    }
}

impl ReputationSink for PrivilegedUpdater {
    fn record(
        &self,
        host: &str,
        verdict: Verdict,
        logger: &dyn Logger,
    ) -> Result<WorkerOutcome, StoreError> {
        let _proof = match drop_privileges(self.uid, self.gid) {
            Ok(proof) => proof,
            Err(err) => {
                logger.warn(&format!("privilege drop failed, verdict not recorded: {err}"));
                return Ok(WorkerOutcome::Failed);
            }
        };

        let store = HostStore::open_read_write(&self.store)?;
        self.apply(&store, host, verdict)?;
        Ok(WorkerOutcome::Completed)
    }
}

/// Test sink that records verdicts in memory.
#[derive(Debug, Clone)]
pub struct MockSink {
    outcome: WorkerOutcome,
    records: Arc<Mutex<Vec<(String, Verdict)>>>,
}

impl MockSink {
    /// Sink whose writes always complete.
    pub fn completing() -> Self {
        Self {
            outcome: WorkerOutcome::Completed,
            records: Default::default(),
        }
    }

    /// Sink whose writes are always skipped.
    pub fn failing() -> Self {
        Self {
            outcome: WorkerOutcome::Failed,
            records: Default::default(),
        }
    }

    /// Recorded (host, verdict) pairs.
    pub fn records(&self) -> Vec<(String, Verdict)> {
        self.records.lock().unwrap().clone()
    }
}

impl ReputationSink for MockSink {
    fn record(
        &self,
        host: &str,
        verdict: Verdict,
        _logger: &dyn Logger,
    ) -> Result<WorkerOutcome, StoreError> {
        self.records.lock().unwrap().push((host.to_string(), verdict));
        Ok(self.outcome)
    }
}

/// Convenience for tests and tooling: read a host's penalty without
/// touching process credentials.
pub fn read_penalty(store: &Path, host: &str) -> Result<u32, StoreError> {
    HostStore::open_read_only(store)?.get_penalty(host)
}
