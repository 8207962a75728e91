//! Launching the protected service on the inherited connection.
//!
//! The gate inherits the connected socket on descriptor 0 and passes it
//! straight through: the service reads and writes the peer as if inetd
//! had launched it directly. The gate only needs to know when the service
//! finished and with what status.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use repgate_net::TcpSnapshot;

/// What the gate learned from one service run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    /// Seconds between launch and service exit, on the monotonic clock.
    pub elapsed_secs: u64,
    /// Socket state observed immediately after the service exited.
    pub snapshot: TcpSnapshot,
}

/// Trait for running the protected service to completion.
pub trait ProcessLauncher: Send + Sync {
    /// Run `program` with `args`, inheriting the current stdio, and block
    /// until it exits. Returns the exit code, with -1 standing in for
    /// signal termination.
    fn launch_and_wait(&self, program: &Path, args: &[OsString]) -> io::Result<i32>;
}

/// Production launcher backed by `std::process::Command`.
///
/// stdin/stdout/stderr are inherited by default, which is exactly what the
/// pass-through contract needs: descriptor 0 is the peer connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl CommandLauncher {
    /// Create a new launcher.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch_and_wait(&self, program: &Path, args: &[OsString]) -> io::Result<i32> {
        let status = Command::new(program).args(args).status()?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// A recorded launch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub program: std::path::PathBuf,
    pub args: Vec<OsString>,
}

/// Test launcher that records launches and returns a preset result.
#[derive(Debug, Clone)]
pub struct MockLauncher {
    exit_code: i32,
    fail: bool,
    launches: Arc<Mutex<Vec<LaunchRecord>>>,
}

impl MockLauncher {
    /// Launcher whose service always exits with `exit_code`.
    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            exit_code,
            fail: false,
            launches: Default::default(),
        }
    }

    /// Launcher whose launch always fails with `NotFound`.
    pub fn failing() -> Self {
        Self {
            exit_code: 0,
            fail: true,
            launches: Default::default(),
        }
    }

    /// Launches requested so far.
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().unwrap().clone()
    }
}

impl ProcessLauncher for MockLauncher {
    fn launch_and_wait(&self, program: &Path, args: &[OsString]) -> io::Result<i32> {
        self.launches.lock().unwrap().push(LaunchRecord {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "mock launch failure"));
        }
        Ok(self.exit_code)
    }
}
