//! Convergence waiter
//!
//! `az containerapp update --no-wait` returns before the new revision is
//! live. The waiter polls the app until it reports `Succeeded` and runs
//! the expected image.

use crate::budget::PollBudget;
use crate::error::{CloudError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// One reading of an app's rollout state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// Provisioning state (`Succeeded`, `InProgress`, `Failed`...)
    pub state: String,
    /// Image of the first container in the active template
    pub image: String,
}

impl Observation {
    pub fn new(state: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            image: image.into(),
        }
    }

    /// State is `succeeded` (any case) and the image matches exactly.
    pub fn has_converged(&self, expected_image: &str) -> bool {
        self.state.eq_ignore_ascii_case("succeeded") && self.image == expected_image
    }
}

/// Reads the current rollout state of an app.
#[async_trait]
pub trait RolloutProbe: Send + Sync {
    async fn observe(&self, app: &str) -> Result<Observation>;
}

/// Polls `app` until it converges on `expected_image`.
///
/// A failed observation counts as "not yet" for that iteration.
pub async fn wait_for_convergence(
    probe: &dyn RolloutProbe,
    app: &str,
    expected_image: &str,
    budget: &PollBudget,
) -> Result<()> {
    let mut last = Observation::default();

    while !budget.expired() {
        if budget.is_cancelled() {
            return Err(cancelled(app));
        }

        match probe.observe(app).await {
            Ok(observation) => {
                println!(
                    "Wait {}: state={} image={}",
                    app, observation.state, observation.image
                );
                if observation.has_converged(expected_image) {
                    tracing::info!(app, image = expected_image, "Rollout converged");
                    return Ok(());
                }
                last = observation;
            }
            Err(e) => {
                tracing::debug!(app, error = %e, "Rollout query failed, polling again");
            }
        }

        if !budget.pause().await {
            return Err(cancelled(app));
        }
    }

    Err(CloudError::ConvergenceTimeout {
        app: app.to_string(),
        expected_image: expected_image.to_string(),
        last_state: last.state,
        last_image: last.image,
    })
}

fn cancelled(app: &str) -> CloudError {
    CloudError::Cancelled(format!("waiting for {} to converge", app))
}
