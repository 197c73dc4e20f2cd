use crate::utils;
use capflow_core::select_build_targets;
use colored::Colorize;
use std::path::Path;

/// Loads the manifest and prints what deploy and build would touch.
/// Runs no commands.
pub fn handle(env: &str, services_file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Validating services file...".blue());

    let path = capflow_config::find_manifest_file(services_file)?;
    let manifest = utils::load_manifest(&path)?;
    if manifest.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    let deploy = capflow_core::select_deploy_targets(&manifest, env)?;
    let build = select_build_targets(&manifest);

    println!("{}", "✓ Services file is valid".green().bold());
    println!();
    println!("Services: {}", manifest.len());

    println!("Deploy targets for env={} ({}):", env.cyan(), deploy.targets.len());
    for target in &deploy.targets {
        let env_vars = if target.env_vars.is_empty() {
            String::new()
        } else {
            format!(", {} env vars", target.env_vars.len())
        };
        let health = match target.spec.health_check.as_ref() {
            Some(h) if !h.skip && !h.url().is_empty() => format!(", health {}", h.url()),
            _ => String::new(),
        };
        println!(
            "  - {} → {} ({}{}{})",
            target.name.cyan(),
            target.app_name,
            target.repo,
            env_vars,
            health
        );
    }
    utils::print_skipped("  skipped", &deploy.skipped);

    println!("Build targets ({}):", build.targets.len());
    for target in &build.targets {
        println!("  - {} ({} from {})", target.name.cyan(), target.repo, target.path);
    }
    utils::print_skipped("  skipped", &build.skipped);

    Ok(())
}
