//! repgate: reputation-based connection-admission gate.
//!
//! Designed to run under inetd or an equivalent per-connection supervisor
//! with the accepted socket on descriptor 0. Hosts that behaved badly on
//! previous connections wait out a stored penalty before the protected
//! service is launched; the connection's behavior then updates the stored
//! reputation for next time.

use std::process::ExitCode;

use clap::Parser;

use repgate_clock::SteadyClock;
use repgate_gate::cli::Cli;
use repgate_gate::exit::{codes, exit_code};
use repgate_gate::{
    execute, CommandLauncher, ForkDelayGate, Logger, PrivilegedUpdater, RealSleeper, StderrLogger,
};
use repgate_net::SocketProbe;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap prints help/version to stdout and usage errors to
            // stderr; only the latter count as failures here.
            let _ = err.print();
            let code = if err.use_stderr() { codes::FAILURE } else { codes::SUCCESS };
            return ExitCode::from(code as u8);
        }
    };

    let logger = StderrLogger::new();
    let gate = ForkDelayGate::new(cli.store.clone(), cli.uid, cli.gid);
    let sink = PrivilegedUpdater::new(cli.store.clone(), cli.uid, cli.gid);

    let result = execute(
        &cli,
        &gate,
        &sink,
        &CommandLauncher::new(),
        &SocketProbe::stdin(),
        &SteadyClock::new(),
        &RealSleeper::new(),
        &logger,
    );

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(err) => {
            logger.error(&err.to_string());
            ExitCode::from(exit_code(&err) as u8)
        }
    }
}
