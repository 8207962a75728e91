//! CLI argument parsing for the gate.
//!
//! The invocation surface matches what an inetd-style supervisor passes:
//! positional store path, unprivileged identity, and the protected service
//! command line, with descriptor 0 already connected to the remote peer.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::TypedValueParser as _;
use clap::Parser;
use thiserror::Error;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("store path must not be empty")]
    EmptyStorePath,

    #[error("service program must not be empty")]
    EmptyProgram,
}

/// Reputation-based connection-admission gate.
///
/// Delays hosts with a bad reputation before handing the inherited
/// connection to the protected service, then records a verdict on the
/// connection's behavior.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "repgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the host reputation database.
    ///
    /// Emptiness is checked by `validate`, not the parser, so the
    /// dedicated `CliError` variants can report it.
    #[arg(value_parser = clap::builder::OsStringValueParser::new().map(PathBuf::from))]
    pub store: PathBuf,

    /// Unprivileged uid used for store access and the final drop.
    pub uid: u32,

    /// Unprivileged gid used for store access and the final drop.
    pub gid: u32,

    /// Protected service program to execute once the gate opens.
    #[arg(value_parser = clap::builder::OsStringValueParser::new().map(PathBuf::from))]
    pub program: PathBuf,

    /// Arguments passed through to the protected service.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub service_args: Vec<OsString>,
}

impl Cli {
    /// Validate the arguments beyond what parsing enforces.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.store.as_os_str().is_empty() {
            return Err(CliError::EmptyStorePath);
        }
        if self.program.as_os_str().is_empty() {
            return Err(CliError::EmptyProgram);
        }
        Ok(())
    }
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
