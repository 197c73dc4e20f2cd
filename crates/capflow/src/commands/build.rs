use crate::utils;
use capflow_build::{ImageBuilder, LoginMethod, registry_login, validate_tag};
use capflow_cloud::CommandRunner;
use capflow_config::BuildConfig;
use colored::Colorize;

pub async fn handle(config: &BuildConfig) -> anyhow::Result<()> {
    validate_tag(&config.tag).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let manifest = utils::load_manifest(&config.services_file)?;
    if manifest.is_empty() {
        println!("No services found to build.");
        return Ok(());
    }

    let runner = CommandRunner::process(config.dry_run);
    let method = registry_login(&runner, &config.registry)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    if method == LoginMethod::None {
        println!(
            "{}",
            "No registry credentials given, using the existing docker login".yellow()
        );
    }

    let selection = capflow_core::select_build_targets(&manifest);
    let builder = ImageBuilder::new(runner, config.registry.server.as_str());

    // skips are reported in manifest order, interleaved with builds
    let mut pushed = Vec::new();
    for (name, _) in manifest.iter() {
        if let Some(skip) = selection.skipped.iter().find(|s| s.service == name) {
            utils::print_skipped("Skipping build for", std::slice::from_ref(skip));
            continue;
        }
        if let Some(target) = selection.targets.iter().find(|t| t.name == name) {
            pushed.push(builder.build_and_push(target, &config.tag).await?);
        }
    }

    println!();
    println!(
        "{}",
        format!("✓ Pushed {} images", pushed.len()).green().bold()
    );
    for image in &pushed {
        println!("  • {}", image.cyan());
    }
    Ok(())
}
