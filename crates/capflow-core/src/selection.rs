//! Target selection
//!
//! Narrows a manifest down to the services an action should touch. Skips
//! are intentional exclusions and only get reported; a deploy entry
//! without `appName` is an authoring bug and stops the run.

use crate::error::{ManifestError, Result};
use crate::model::{DeploySpec, ServiceManifest};
use std::fmt;
use tracing::{debug, info};

/// A (service, environment) pair selected for deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployTarget {
    pub name: String,
    pub repo: String,
    pub app_name: String,
    pub spec: DeploySpec,
    /// `envVars` already expanded into `KEY=VALUE` arguments
    pub env_vars: Vec<String>,
}

impl DeployTarget {
    /// `{registry_server}/{repo}:{tag}`, the image the app must end up running.
    pub fn image_reference(&self, registry_server: &str, tag: &str) -> String {
        image_reference(registry_server, &self.repo, tag)
    }
}

/// A service selected for `docker build` + `docker push`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildTarget {
    pub name: String,
    pub repo: String,
    pub path: String,
}

impl BuildTarget {
    pub fn image_reference(&self, registry_server: &str, tag: &str) -> String {
        image_reference(registry_server, &self.repo, tag)
    }
}

pub fn image_reference(registry_server: &str, repo: &str, tag: &str) -> String {
    format!("{}/{}:{}", registry_server, repo, tag)
}

/// Why a service was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingRepo,
    ServiceSkipped,
    NoDeployConfig { env: String },
    EnvSkipped,
    BuildSkipped,
    MissingRepoOrPath,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingRepo => write!(f, "missing repo"),
            SkipReason::ServiceSkipped => write!(f, "service skip=true"),
            SkipReason::NoDeployConfig { env } => write!(f, "no deploy config for env={}", env),
            SkipReason::EnvSkipped => write!(f, "env skip=true"),
            SkipReason::BuildSkipped => write!(f, "skip=true"),
            SkipReason::MissingRepoOrPath => write!(f, "missing repo/path"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub service: String,
    pub reason: SkipReason,
}

/// Outcome of selection: the targets in manifest order plus what was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    pub targets: Vec<T>,
    pub skipped: Vec<Skipped>,
}

impl<T> Selection<T> {
    fn new() -> Self {
        Self {
            targets: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn skip(&mut self, service: &str, reason: SkipReason) {
        debug!(service, %reason, "Skipping service");
        self.skipped.push(Skipped {
            service: service.to_string(),
            reason,
        });
    }
}

/// Selects the deploy targets for `env`.
///
/// Filters run in order: missing repo, service skip, missing env config,
/// env skip. A remaining entry with an empty `appName` (or unparsable
/// `envVars`) aborts selection immediately; services after it are not
/// examined.
pub fn select_deploy_targets(
    manifest: &ServiceManifest,
    env: &str,
) -> Result<Selection<DeployTarget>> {
    let mut selection = Selection::new();

    for (name, svc) in manifest.iter() {
        let repo = svc.repo();
        if repo.is_empty() {
            selection.skip(name, SkipReason::MissingRepo);
            continue;
        }

        if svc.skip {
            selection.skip(name, SkipReason::ServiceSkipped);
            continue;
        }

        let Some(spec) = svc.deploy_for(env) else {
            selection.skip(
                name,
                SkipReason::NoDeployConfig {
                    env: env.to_string(),
                },
            );
            continue;
        };

        if spec.skip {
            selection.skip(name, SkipReason::EnvSkipped);
            continue;
        }

        let app_name = spec.app_name();
        if app_name.is_empty() {
            return Err(ManifestError::missing_app_name(name, env));
        }

        let env_vars = match &spec.env_vars {
            Some(vars) => vars
                .to_args()
                .map_err(|e| ManifestError::ManifestEntryInvalid {
                    service: name.to_string(),
                    env: env.to_string(),
                    message: format!("has invalid envVars ({})", e),
                })?,
            None => Vec::new(),
        };

        selection.targets.push(DeployTarget {
            name: name.to_string(),
            repo: repo.to_string(),
            app_name: app_name.to_string(),
            spec: spec.clone(),
            env_vars,
        });
    }

    info!(
        env,
        targets = selection.targets.len(),
        skipped = selection.skipped.len(),
        "Deploy targets selected"
    );
    Ok(selection)
}

/// Selects the services that have something to build.
///
/// Never fails: a service without a repo or build path is skipped.
pub fn select_build_targets(manifest: &ServiceManifest) -> Selection<BuildTarget> {
    let mut selection = Selection::new();

    for (name, svc) in manifest.iter() {
        let build = svc.build.clone().unwrap_or_default();
        if build.skip {
            selection.skip(name, SkipReason::BuildSkipped);
            continue;
        }

        let repo = svc.repo();
        let path = build.path();
        if repo.is_empty() || path.is_empty() {
            selection.skip(name, SkipReason::MissingRepoOrPath);
            continue;
        }

        selection.targets.push(BuildTarget {
            name: name.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
        });
    }

    info!(targets = selection.targets.len(), "Build targets selected");
    selection
}
