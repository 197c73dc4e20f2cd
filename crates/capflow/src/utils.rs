use capflow_cloud::{CancelSignal, cancel_pair};
use capflow_config::{Action, BuildConfig, DeployConfig, RegistryConfig};
use capflow_core::{ServiceManifest, Skipped};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Raw flag values for a deploy, update or provision run.
pub struct DeployInputs {
    pub action: Action,
    pub tag: String,
    pub registry: RegistryConfig,
    pub resource_group: String,
    pub env: String,
    pub services_file: Option<PathBuf>,
    pub dry_run: bool,
    pub environment_name: Option<String>,
}

pub fn deploy_config(inputs: DeployInputs) -> anyhow::Result<DeployConfig> {
    let services_file = capflow_config::find_manifest_file(inputs.services_file.as_deref())?;
    let config = DeployConfig {
        action: inputs.action,
        tag: inputs.tag.trim().to_string(),
        registry: inputs.registry,
        resource_group: inputs.resource_group,
        env: inputs.env,
        services_file,
        dry_run: inputs.dry_run,
        environment_name: inputs
            .environment_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
    };
    config.validate()?;
    Ok(config)
}

pub fn build_config(
    tag: String,
    registry: RegistryConfig,
    services_file: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<BuildConfig> {
    let config = BuildConfig {
        tag: tag.trim().to_string(),
        registry,
        services_file: capflow_config::find_manifest_file(services_file)?,
        dry_run,
    };
    config.validate()?;
    Ok(config)
}

/// Loads the manifest, printing the file being used.
pub fn load_manifest(path: &Path) -> anyhow::Result<ServiceManifest> {
    println!("📄 Services file: {}", path.display().to_string().cyan());
    Ok(capflow_core::load_manifest(path)?)
}

/// Prints one `Skipping ...` line per skipped service.
pub fn print_skipped(prefix: &str, skipped: &[Skipped]) {
    for skip in skipped {
        println!("{} {} ({})", prefix, skip.service, skip.reason);
    }
}

/// Signal that fires on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, stopping...".yellow());
            handle.cancel();
        }
    });
    signal
}
