use crate::rollout::{Rollout, RolloutSettings};
use crate::utils;
use capflow_cloud::{CancelSignal, CommandRunner, HttpProbe, ReqwestProbe};
use capflow_cloud_azure::AzCli;
use capflow_config::DeployConfig;
use capflow_core::ServiceManifest;
use colored::Colorize;

/// `deploy` and `update`.
///
/// The manifest is loaded and every target selected before anything runs,
/// so a broken entry stops the run with nothing changed.
pub async fn handle(config: &DeployConfig, cancel: CancelSignal) -> anyhow::Result<()> {
    println!(
        "Action={} tag={} env={} dryRun={}",
        config.action, config.tag, config.env, config.dry_run
    );

    let manifest = utils::load_manifest(&config.services_file)?;
    if manifest.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    let az = AzCli::new(
        CommandRunner::process(config.dry_run),
        config.resource_group.as_str(),
    );
    let http = ReqwestProbe::new()?;
    deploy(&az, &http, &manifest, config, cancel).await
}

async fn deploy(
    az: &AzCli,
    http: &dyn HttpProbe,
    manifest: &ServiceManifest,
    config: &DeployConfig,
    cancel: CancelSignal,
) -> anyhow::Result<()> {
    let selection = capflow_core::select_deploy_targets(manifest, &config.env)?;
    utils::print_skipped("Skipping", &selection.skipped);

    if let Some(acr_name) = config.registry.acr_name() {
        az.acr_login(acr_name).await?;
    }

    if selection.targets.is_empty() {
        println!(
            "{}",
            format!("No deploy targets for env={}.", config.env).yellow()
        );
        return Ok(());
    }

    if !config.dry_run {
        if let Some(acr_name) = config.registry.acr_name() {
            let repos = selection.targets.iter().map(|t| t.repo.as_str());
            az.verify_tags(acr_name, repos, &config.tag).await?;
        }
    }

    println!();
    println!(
        "{}",
        format!("Deploy targets ({}):", selection.targets.len()).bold()
    );
    for target in &selection.targets {
        println!("  • {} → {}", target.name.cyan(), target.app_name);
    }
    println!();

    let rollout = Rollout::new(az, http, config, RolloutSettings::default(), cancel);
    for target in &selection.targets {
        rollout.run(target).await?;
    }

    println!();
    println!(
        "{}",
        format!("✓ {} complete ({} services)", config.action, selection.targets.len())
            .green()
            .bold()
    );
    Ok(())
}
