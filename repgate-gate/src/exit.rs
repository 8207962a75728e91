//! Exit codes reported to the process supervisor.

use crate::run::GateError;

/// Exit codes.
pub mod codes {
    /// Connection handled and verdict recorded.
    pub const SUCCESS: i32 = 0;
    /// Anything else. The supervisor only distinguishes success from
    /// failure, so the taxonomy lives in the logs, not the code.
    pub const FAILURE: i32 = 1;
}

/// Map an error to the exit code reported to the supervisor.
pub fn exit_code(_error: &GateError) -> i32 {
    codes::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        assert_ne!(codes::SUCCESS, codes::FAILURE);
    }

    #[test]
    fn test_every_error_maps_to_failure() {
        assert_eq!(exit_code(&GateError::PeerClosedDuringDelay), codes::FAILURE);
        assert_eq!(exit_code(&GateError::VerdictNotRecorded), codes::FAILURE);
        assert_eq!(
            exit_code(&GateError::InvalidArgument(
                crate::cli::CliError::EmptyStorePath
            )),
            codes::FAILURE
        );
    }
}
