//! Per-target rollout
//!
//! Pending → Updating → Updated → Converging → Converged → HealthChecking
//! → Healthy, with a failed state for each active step. `update` and
//! dry-run stop at Updated.

use capflow_cloud::{
    CancelSignal, DEFAULT_CONVERGENCE_TIMEOUT, DEFAULT_POLL_INTERVAL, HttpProbe, PollBudget,
    RetryPolicy, check_health, wait_for_convergence,
};
use capflow_cloud_azure::AzCli;
use capflow_config::DeployConfig;
use capflow_core::DeployTarget;
use colored::Colorize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Updating,
    Updated,
    UpdateFailed,
    Converging,
    Converged,
    ConvergeFailed,
    HealthChecking,
    Healthy,
    HealthFailed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Pending => "pending",
            Stage::Updating => "updating",
            Stage::Updated => "updated",
            Stage::UpdateFailed => "update failed",
            Stage::Converging => "converging",
            Stage::Converged => "converged",
            Stage::ConvergeFailed => "rollout did not converge",
            Stage::HealthChecking => "health checking",
            Stage::Healthy => "healthy",
            Stage::HealthFailed => "health check failed",
        };
        write!(f, "{}", s)
    }
}

/// A target that ended in a failed stage.
#[derive(Debug)]
pub struct RolloutError {
    pub service: String,
    pub stage: Stage,
    pub source: anyhow::Error,
}

impl fmt::Display for RolloutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service, self.stage)
    }
}

impl std::error::Error for RolloutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + 'static) = self.source.as_ref();
        Some(source)
    }
}

/// Timing knobs of a rollout.
#[derive(Debug, Clone, Copy)]
pub struct RolloutSettings {
    pub retry: RetryPolicy,
    pub convergence_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::control_plane(),
            convergence_timeout: DEFAULT_CONVERGENCE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct Rollout<'a> {
    az: &'a AzCli,
    http: &'a dyn HttpProbe,
    config: &'a DeployConfig,
    settings: RolloutSettings,
    cancel: CancelSignal,
}

impl<'a> Rollout<'a> {
    pub fn new(
        az: &'a AzCli,
        http: &'a dyn HttpProbe,
        config: &'a DeployConfig,
        settings: RolloutSettings,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            az,
            http,
            config,
            settings,
            cancel,
        }
    }

    /// Drives one target through its stages. Returns the final stage.
    pub async fn run(&self, target: &DeployTarget) -> Result<Stage, RolloutError> {
        let mut tracker = Tracker::new(&target.name);
        let image = target.image_reference(&self.config.registry.server, &self.config.tag);
        let app = target.app_name.as_str();

        tracker.advance(Stage::Updating);
        println!(
            "{} {} -> {} ({})",
            "Updating".blue(),
            target.name.cyan(),
            app,
            image
        );
        if let Err(e) = self
            .az
            .update_image(app, &image, &target.env_vars, self.settings.retry)
            .await
        {
            let diagnostics = self.az.diagnostics(app).await;
            eprintln!("{}", diagnostics.to_string().yellow());
            return Err(tracker.fail(Stage::UpdateFailed, e.into()));
        }
        tracker.advance(Stage::Updated);

        if self.config.dry_run || !self.config.action.verifies_rollout() {
            return Ok(tracker.stage);
        }

        tracker.advance(Stage::Converging);
        let budget = PollBudget::new(
            self.settings.convergence_timeout,
            self.settings.poll_interval,
            self.cancel.clone(),
        );
        if let Err(e) = wait_for_convergence(self.az, app, &image, &budget).await {
            return Err(tracker.fail(Stage::ConvergeFailed, e.into()));
        }
        tracker.advance(Stage::Converged);

        tracker.advance(Stage::HealthChecking);
        if let Err(e) = check_health(
            self.http,
            &target.name,
            target.spec.health_check.as_ref(),
            &self.cancel,
        )
        .await
        {
            return Err(tracker.fail(Stage::HealthFailed, e.into()));
        }
        tracker.advance(Stage::Healthy);

        println!("  {} {}", "✓".green(), target.name.cyan());
        Ok(tracker.stage)
    }
}

struct Tracker<'a> {
    service: &'a str,
    stage: Stage,
}

impl<'a> Tracker<'a> {
    fn new(service: &'a str) -> Self {
        Self {
            service,
            stage: Stage::Pending,
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(service = self.service, from = %self.stage, to = %next, "Rollout stage");
        self.stage = next;
    }

    fn fail(&mut self, failed: Stage, source: anyhow::Error) -> RolloutError {
        self.advance(failed);
        tracing::warn!(service = self.service, stage = %failed, error = %source, "Rollout failed");
        RolloutError {
            service: self.service.to_string(),
            stage: failed,
            source,
        }
    }
}
