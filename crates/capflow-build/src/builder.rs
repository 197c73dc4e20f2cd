//! docker build + push

use crate::error::Result;
use crate::tag::validate_tag;
use capflow_cloud::{CommandLine, CommandRunner};
use capflow_core::BuildTarget;
use colored::Colorize;

/// Builds service images and pushes them to the registry.
pub struct ImageBuilder {
    runner: CommandRunner,
    registry_server: String,
}

impl ImageBuilder {
    pub fn new(runner: CommandRunner, registry_server: impl Into<String>) -> Self {
        Self {
            runner,
            registry_server: registry_server.into(),
        }
    }

    /// Builds and pushes one target, returning the pushed image reference.
    pub async fn build_and_push(&self, target: &BuildTarget, tag: &str) -> Result<String> {
        validate_tag(tag)?;
        let image = target.image_reference(&self.registry_server, tag);

        println!(
            "Building {} ({}) from {}",
            target.name.cyan(),
            target.repo,
            target.path
        );
        self.runner
            .run(&CommandLine::new("docker").args(["build", "-t", image.as_str(), target.path.as_str()]))
            .await?;

        println!("  → {}", image.cyan());
        self.runner
            .run(&CommandLine::new("docker").args(["push", image.as_str()]))
            .await?;

        tracing::info!(service = %target.name, image = %image, "Image pushed");
        Ok(image)
    }
}
