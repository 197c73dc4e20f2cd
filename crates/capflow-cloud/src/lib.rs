//! capflow cloud plumbing
//!
//! Provider-neutral pieces shared by the `az` and `docker` wrappers:
//! command lines and the runner that executes them, poll budgets with
//! cancellation, the rollout convergence waiter and HTTP health checks.

pub mod budget;
pub mod command;
pub mod error;
pub mod health;
pub mod runner;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod waiter;

pub use budget::{CancelHandle, CancelSignal, PollBudget, cancel_pair};
pub use command::CommandLine;
pub use error::{CloudError, Result};
pub use health::{HealthOutcome, HttpProbe, ReqwestProbe, check_health};
pub use runner::{CommandExecutor, CommandOutput, CommandRunner, ProcessExecutor, RetryPolicy};
pub use waiter::{
    DEFAULT_CONVERGENCE_TIMEOUT, DEFAULT_POLL_INTERVAL, Observation, RolloutProbe,
    wait_for_convergence,
};
