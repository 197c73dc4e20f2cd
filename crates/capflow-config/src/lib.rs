//! capflow run configuration
//!
//! Flags are parsed once at startup into immutable values that every
//! command receives by reference.

pub mod error;

pub use error::*;

use std::fmt;
use std::path::{Path, PathBuf};

/// Env var pointing at the services file.
pub const SERVICES_FILE_ENV: &str = "CAPFLOW_SERVICES_FILE";

/// What `deploy` does after updating an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Update, wait for convergence, then run health checks
    Deploy,
    /// Update only
    Update,
}

impl Action {
    pub fn verifies_rollout(self) -> bool {
        matches!(self, Action::Deploy)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Deploy => write!(f, "deploy"),
            Action::Update => write!(f, "update"),
        }
    }
}

/// Container registry endpoint and credentials.
#[derive(Clone, Default)]
pub struct RegistryConfig {
    /// Login server, optionally with a namespace (`myacr.azurecr.io/team`)
    pub server: String,
    /// ACR resource name, used for `az acr` calls
    pub acr_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RegistryConfig {
    /// Server part up to the first `/`, as used for `docker login`.
    pub fn host(&self) -> &str {
        self.server.split('/').next().unwrap_or_default()
    }

    /// Username and password when both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((username, password))
    }

    pub fn acr_name(&self) -> Option<&str> {
        self.acr_name.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("server", &self.server)
            .field("acr_name", &self.acr_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Configuration of a deploy, update or provision run.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub action: Action,
    pub tag: String,
    pub registry: RegistryConfig,
    pub resource_group: String,
    /// Environment key in the manifest's `deploy` map (dev, stg, prod...)
    pub env: String,
    pub services_file: PathBuf,
    pub dry_run: bool,
    /// Container Apps managed environment, used by provision
    pub environment_name: Option<String>,
}

impl DeployConfig {
    pub fn validate(&self) -> Result<()> {
        require("tag", &self.tag)?;
        require("registry server", &self.registry.server)?;
        require("resource group", &self.resource_group)?;
        require("env", &self.env)?;
        Ok(())
    }
}

/// Configuration of a build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub tag: String,
    pub registry: RegistryConfig,
    pub services_file: PathBuf,
    pub dry_run: bool,
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        require("tag", &self.tag)?;
        require("registry server", &self.registry.server)?;
        Ok(())
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(format!("{} must not be empty", name)));
    }
    Ok(())
}

/// Resolves the services file.
///
/// Search order:
/// 1. `explicit` (from `--services-file`), returned even if missing so the
///    loader can report it
/// 2. `CAPFLOW_SERVICES_FILE`
/// 3. current directory: services.json, pipelines/services.json, .capflow/services.json
/// 4. ~/.config/capflow/services.json
pub fn find_manifest_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(SERVICES_FILE_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = [
        "services.json",
        "pipelines/services.json",
        ".capflow/services.json",
    ];
    for candidate in &candidates {
        let path = current_dir.join(candidate);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("capflow").join("services.json");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ManifestFileNotFound)
}
