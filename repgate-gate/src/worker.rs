//! Fork-isolated execution of a single unit of work.
//!
//! Store access happens under reduced privileges while the parent keeps
//! the elevated identity it needs to launch the protected service later.
//! Running the work in a forked child gives it a private copy of the
//! address space: nothing it does can reach back into the parent, and the
//! only channel home is the exit status.

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult};
use thiserror::Error;

/// Errors creating or reaping the worker process.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("wait failed: {0}")]
    Wait(#[source] nix::Error),
}

/// Binary outcome of an isolated unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The work exited with status 0.
    Completed,
    /// The work exited nonzero or was killed by a signal.
    Failed,
}

/// Run `job` in a forked child and report its outcome.
///
/// The child runs the job and exits with the returned code; it never
/// returns into the caller's control flow. The parent blocks until the
/// child is reaped. fork or wait failure is fatal to the instance.
pub fn run_isolated<F>(job: F) -> Result<WorkerOutcome, WorkerError>
where
    F: FnOnce() -> i32,
{
    // SAFETY: the child immediately runs the job and exits; it does not
    // return into caller code or touch the parent's threads.
    match unsafe { fork() }.map_err(WorkerError::Fork)? {
        ForkResult::Child => {
            let code = job();
            std::process::exit(code);
        }
        ForkResult::Parent { child } => {
            match waitpid(child, None).map_err(WorkerError::Wait)? {
                WaitStatus::Exited(_, 0) => Ok(WorkerOutcome::Completed),
                _ => Ok(WorkerOutcome::Failed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_exit_is_completed() {
        let outcome = run_isolated(|| 0).expect("run");
        assert_eq!(outcome, WorkerOutcome::Completed);
    }

    #[test]
    fn test_nonzero_exit_is_failed() {
        let outcome = run_isolated(|| 1).expect("run");
        assert_eq!(outcome, WorkerOutcome::Failed);
    }

    #[test]
    fn test_job_side_effects_stay_in_the_child() {
        let mut counter = 0_i32;
        let outcome = run_isolated(|| {
            // This mutates the child's copy only.
            counter = 42;
            0
        })
        .expect("run");
        assert_eq!(outcome, WorkerOutcome::Completed);
        assert_eq!(counter, 0);
    }
}
