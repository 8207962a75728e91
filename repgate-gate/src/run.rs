//! End-to-end flow for one connection.
//!
//! One invocation handles exactly one connection: identify the peer, serve
//! its stored delay, hand the socket to the protected service, and record
//! a verdict once the service exits. Every collaborator comes in behind a
//! trait so the flow is testable without sockets, forks, or real time.

use thiserror::Error;

use repgate_clock::Clock;
use repgate_net::{ConnectionProbe, NetError, TcpState};
use repgate_store::StoreError;

use crate::classify::{classify, ConnMetrics, Verdict};
use crate::cli::{Cli, CliError};
use crate::gate::DelayGate;
use crate::logger::Logger;
use crate::sleeper::Sleeper;
use crate::supervise::{ProcessLauncher, ServiceReport};
use crate::update::ReputationSink;
use crate::worker::{WorkerError, WorkerOutcome};

/// Delay served when the peer hung up while waiting out its penalty.
///
/// A peer that abandons the connection before the service even starts is
/// not served; it is held a little longer instead, then dropped.
pub const EARLY_CLOSE_DELAY_SECS: u64 = 10;

/// Any way a connection's handling can fail.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid arguments: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("cannot identify peer: {0}")]
    PeerIdentity(#[source] NetError),

    #[error("cannot inspect connection: {0}")]
    Probe(#[source] NetError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The peer closed its side while the delay was being served.
    #[error("peer closed during delay")]
    PeerClosedDuringDelay,

    #[error("cannot launch service: {0}")]
    Service(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The verdict write was skipped; the connection itself was served.
    #[error("verdict not recorded")]
    VerdictNotRecorded,
}

/// Run the protected service and measure the connection around it.
fn run_service(
    cli: &Cli,
    launcher: &dyn ProcessLauncher,
    clock: &dyn Clock,
    probe: &dyn ConnectionProbe,
    logger: &dyn Logger,
) -> Result<ServiceReport, GateError> {
    let started = clock.now_secs();
    let status = launcher
        .launch_and_wait(&cli.program, &cli.service_args)
        .map_err(GateError::Service)?;
    let finished = clock.now_secs();

    let snapshot = probe.snapshot().map_err(GateError::Probe)?;
    if let Err(err) = probe.shutdown_both() {
        logger.warn(&format!("shutdown after service exit failed: {err}"));
    }

    logger.info(&format!(
        "service {} exited with status {status}",
        cli.program.display()
    ));

    Ok(ServiceReport {
        elapsed_secs: finished.saturating_sub(started),
        snapshot,
    })
}

/// Handle one connection from admission to verdict.
#[allow(clippy::too_many_arguments)]
pub fn execute(
    cli: &Cli,
    gate: &dyn DelayGate,
    sink: &dyn ReputationSink,
    launcher: &dyn ProcessLauncher,
    probe: &dyn ConnectionProbe,
    clock: &dyn Clock,
    sleeper: &dyn Sleeper,
    logger: &dyn Logger,
) -> Result<(), GateError> {
    cli.validate()?;

    let host = probe.peer_host().map_err(GateError::PeerIdentity)?;

    // A failed delay pass degrades to no delay; the connection is still
    // admitted and still judged.
    if gate.apply(&host, logger)? == WorkerOutcome::Failed {
        logger.warn(&format!("delay pass for {host} failed, admitting without delay"));
    }

    // Peers that hang up while being delayed never reach the service and
    // never touch the store. They are held a bit longer and dropped.
    let pre = probe.snapshot().map_err(GateError::Probe)?;
    if pre.state == TcpState::CloseWait {
        logger.info(&format!("{host} closed during delay, holding {EARLY_CLOSE_DELAY_SECS}s"));
        sleeper.sleep_secs(EARLY_CLOSE_DELAY_SECS);
        return Err(GateError::PeerClosedDuringDelay);
    }

    let report = run_service(cli, launcher, clock, probe, logger)?;

    let metrics = ConnMetrics::new(&report.snapshot, report.elapsed_secs);
    let verdict = classify(&metrics);
    logger.info(&format!(
        "{host}: {} ({} segments in, {}s, {} bytes acked)",
        match verdict {
            Verdict::Benign => "benign",
            Verdict::Suspicious => "suspicious",
        },
        metrics.segments_in,
        metrics.elapsed_secs,
        metrics.bytes_acked
    ));

    match sink.record(&host, verdict, logger)? {
        WorkerOutcome::Completed => Ok(()),
        WorkerOutcome::Failed => Err(GateError::VerdictNotRecorded),
    }
}
