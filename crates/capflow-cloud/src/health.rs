//! HTTP health checks run after a rollout converges

use crate::budget::CancelSignal;
use crate::error::{CloudError, Result};
use async_trait::async_trait;
use capflow_core::HealthCheckSpec;
use std::time::Duration;

pub const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues a GET and returns the status code.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get_status(&self, url: &str) -> Result<u16>;
}

/// [`HttpProbe`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HEALTH_REQUEST_TIMEOUT)
            .user_agent(concat!("capflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn get_status(&self, url: &str) -> Result<u16> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    /// Nothing to check; the reason was printed
    Skipped(&'static str),
    Passed { status: u16, attempts: u32 },
}

/// Probes the service's health URL until it answers with the expected
/// status or the retries run out.
pub async fn check_health(
    probe: &dyn HttpProbe,
    name: &str,
    spec: Option<&HealthCheckSpec>,
    cancel: &CancelSignal,
) -> Result<HealthOutcome> {
    let Some(spec) = spec else {
        tracing::debug!(service = name, "No health check configured");
        return Ok(HealthOutcome::Skipped("not configured"));
    };
    if spec.skip {
        println!("Health check skipped for {}", name);
        return Ok(HealthOutcome::Skipped("skip=true"));
    }
    let url = spec.url();
    if url.is_empty() {
        println!("Health check skipped for {} (empty url)", name);
        return Ok(HealthOutcome::Skipped("empty url"));
    }

    println!(
        "Health check for {}: {} expect={} retries={}",
        name, url, spec.expected_status, spec.retries
    );

    let delay = Duration::from_secs(spec.delay_seconds);
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=spec.retries {
        match probe.get_status(url).await {
            Ok(status) if status == spec.expected_status => {
                println!("Health check passed for {} (status={})", name, status);
                return Ok(HealthOutcome::Passed {
                    status,
                    attempts: attempt,
                });
            }
            Ok(status) => last_error = format!("status={}", status),
            Err(e) => last_error = e.to_string(),
        }
        tracing::debug!(service = name, attempt, error = %last_error, "Health check attempt failed");

        if attempt < spec.retries && !cancel.sleep(delay).await {
            return Err(CloudError::Cancelled(format!("health checking {}", name)));
        }
    }

    Err(CloudError::HealthCheckFailed {
        service: name.to_string(),
        url: url.to_string(),
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProbe;

    fn spec(retries: u32) -> HealthCheckSpec {
        HealthCheckSpec {
            url: Some("https://api.example.com/health".into()),
            retries,
            delay_seconds: 5,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_on_third_attempt() {
        let probe = ScriptedProbe::new([500, 500, 200]);
        let start = tokio::time::Instant::now();

        let outcome = check_health(&probe, "api", Some(&spec(3)), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            HealthOutcome::Passed {
                status: 200,
                attempts: 3
            }
        );
        assert_eq!(probe.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail() {
        let probe = ScriptedProbe::new([503]);
        let start = tokio::time::Instant::now();

        let err = check_health(&probe, "api", Some(&spec(2)), &CancelSignal::never())
            .await
            .unwrap_err();

        match err {
            CloudError::HealthCheckFailed {
                service,
                url,
                last_error,
            } => {
                assert_eq!(service, "api");
                assert_eq!(url, "https://api.example.com/health");
                assert_eq!(last_error, "status=503");
            }
            other => panic!("expected HealthCheckFailed, got {:?}", other),
        }
        assert_eq!(probe.calls(), 2);
        // no sleep after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_skips_without_probing() {
        let probe = ScriptedProbe::new([200]);
        let never = CancelSignal::never();

        let mut skipped = spec(3);
        skipped.skip = true;
        let mut blank = spec(3);
        blank.url = Some("   ".into());

        for health in [None, Some(&skipped), Some(&blank)] {
            let outcome = check_health(&probe, "api", health, &never).await.unwrap();
            assert!(matches!(outcome, HealthOutcome::Skipped(_)));
        }
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_expected_status() {
        let probe = ScriptedProbe::new([200, 204]);
        let mut health = spec(2);
        health.expected_status = 204;
        health.delay_seconds = 0;

        let outcome = check_health(&probe, "api", Some(&health), &CancelSignal::never())
            .await
            .unwrap();
        assert!(matches!(outcome, HealthOutcome::Passed { status: 204, .. }));
    }
}
