//! repgate: adaptive connection-admission gate.
//!
//! Invoked once per inbound connection by an inetd-style supervisor with
//! the connected socket on descriptor 0. The gate delays hosts with a bad
//! reputation, aborts if the peer hangs up during the delay, runs the
//! protected service, classifies the connection's TCP behavior, and
//! persists the verdict for future connections from the same host.

pub mod classify;
pub mod cli;
pub mod exit;
pub mod gate;
pub mod logger;
pub mod privilege;
pub mod run;
pub mod sleeper;
pub mod supervise;
pub mod update;
pub mod worker;

pub use classify::{classify, ConnMetrics, Verdict};
pub use cli::{Cli, CliError};
pub use gate::{DelayGate, ForkDelayGate, MockDelayGate, ERROR_DELAY_SECS};
pub use logger::{Logger, MockLogger, NullLogger, Severity, StderrLogger};
pub use run::{execute, GateError, EARLY_CLOSE_DELAY_SECS};
pub use sleeper::{RealSleeper, RecordingSleeper, Sleeper};
pub use supervise::{CommandLauncher, MockLauncher, ProcessLauncher, ServiceReport};
pub use update::{MockSink, PrivilegedUpdater, ReputationSink};
pub use worker::{run_isolated, WorkerError, WorkerOutcome};
