//! Cloud operation error types

use thiserror::Error;

/// stderr marker of a conflicting control-plane operation
const OPERATION_IN_PROGRESS: &str = "operationinprogress";

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("command failed with exit code {exit_code}: {command}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "timeout waiting for {app} to update to {expected_image} (state={last_state} image={last_image})"
    )]
    ConvergenceTimeout {
        app: String,
        expected_image: String,
        last_state: String,
        last_image: String,
    },

    #[error("health check failed for {service}: {last_error}")]
    HealthCheckFailed {
        service: String,
        url: String,
        last_error: String,
    },

    #[error("cancelled while {0}")]
    Cancelled(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CloudError {
    /// True for the provider's "operation already in progress" conflict,
    /// which resolves on its own after a delay.
    pub fn is_operation_in_progress(&self) -> bool {
        match self {
            CloudError::CommandFailed { stderr, .. } => {
                stderr.to_lowercase().contains(OPERATION_IN_PROGRESS)
            }
            _ => false,
        }
    }

    /// stderr of a failed command, if this is one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CloudError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
