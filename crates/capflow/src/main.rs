mod commands;
mod rollout;
mod utils;

use capflow_config::Action;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "capflow")]
#[command(about = "Ship container images to Azure Container Apps and verify the rollout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update apps to the tag, wait for the rollout and run health checks
    Deploy(DeployArgs),
    /// Update apps to the tag without waiting
    Update(DeployArgs),
    /// Build service images and push them to the registry
    Build(BuildArgs),
    /// Create Container Apps that do not exist yet
    Provision(ProvisionArgs),
    /// Check the services file and show what would be deployed
    Validate {
        /// Environment key in each service's deploy map (dev, stg, prod)
        #[arg(long, env = "CAPFLOW_ENV")]
        env: String,
        /// Path to services.json
        #[arg(long)]
        services_file: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

#[derive(Args)]
struct DeployArgs {
    /// Image tag to roll out
    #[arg(long, env = "CAPFLOW_TAG")]
    tag: String,
    /// ACR resource name (login and tag checks)
    #[arg(long, env = "CAPFLOW_ACR_NAME")]
    acr_name: String,
    /// Registry login server, optionally with a namespace
    #[arg(long, alias = "acr-login-server", env = "CAPFLOW_REGISTRY_SERVER")]
    registry_server: String,
    /// Resource group of the apps
    #[arg(long, alias = "resource-group", env = "CAPFLOW_RESOURCE_GROUP")]
    rg: String,
    /// Environment key in each service's deploy map (dev, stg, prod)
    #[arg(long, env = "CAPFLOW_ENV")]
    env: String,
    /// Path to services.json
    #[arg(long)]
    services_file: Option<PathBuf>,
    /// Print commands without changing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct RegistryArgs {
    /// Registry login server, optionally with a namespace
    #[arg(long, alias = "acr-login-server", env = "CAPFLOW_REGISTRY_SERVER")]
    registry_server: String,
    /// ACR resource name
    #[arg(long, env = "CAPFLOW_ACR_NAME")]
    acr_name: Option<String>,
    /// Registry username (with --registry-password)
    #[arg(long, env = "CAPFLOW_REGISTRY_USERNAME")]
    registry_username: Option<String>,
    /// Registry password (with --registry-username)
    #[arg(long, env = "CAPFLOW_REGISTRY_PASSWORD", hide_env_values = true)]
    registry_password: Option<String>,
}

#[derive(Args)]
struct BuildArgs {
    /// Image tag to build
    #[arg(long, env = "CAPFLOW_TAG")]
    tag: String,
    #[command(flatten)]
    registry: RegistryArgs,
    /// Path to services.json
    #[arg(long)]
    services_file: Option<PathBuf>,
    /// Print commands without changing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct ProvisionArgs {
    /// Image tag for new apps
    #[arg(long, env = "CAPFLOW_TAG")]
    tag: String,
    #[command(flatten)]
    registry: RegistryArgs,
    /// Resource group of the apps
    #[arg(long, alias = "resource-group", env = "CAPFLOW_RESOURCE_GROUP")]
    rg: String,
    /// Environment key in each service's deploy map (dev, stg, prod)
    #[arg(long, env = "CAPFLOW_ENV")]
    env: String,
    /// Container Apps managed environment; resolved from an existing app if omitted
    #[arg(long, env = "CAPFLOW_ENV_NAME")]
    env_name: Option<String>,
    /// Path to services.json
    #[arg(long)]
    services_file: Option<PathBuf>,
    /// Print commands without changing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // logs go to stderr; stdout carries progress and the CMD: trail
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Version => {
            println!("capflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Validate { env, services_file } => {
            commands::validate::handle(&env, services_file.as_deref())
        }
        Commands::Deploy(args) => deploy(Action::Deploy, args).await,
        Commands::Update(args) => deploy(Action::Update, args).await,
        Commands::Build(args) => {
            let config = utils::build_config(
                args.tag,
                args.registry.into_config(),
                args.services_file.as_deref(),
                args.dry_run,
            )?;
            commands::build::handle(&config).await
        }
        Commands::Provision(args) => {
            let config = utils::deploy_config(utils::DeployInputs {
                action: Action::Deploy,
                tag: args.tag,
                registry: args.registry.into_config(),
                resource_group: args.rg,
                env: args.env,
                services_file: args.services_file,
                dry_run: args.dry_run,
                environment_name: args.env_name,
            })?;
            commands::provision::handle(&config).await
        }
    }
}

async fn deploy(action: Action, args: DeployArgs) -> anyhow::Result<()> {
    let config = utils::deploy_config(utils::DeployInputs {
        action,
        tag: args.tag,
        registry: capflow_config::RegistryConfig {
            server: args.registry_server,
            acr_name: Some(args.acr_name),
            username: None,
            password: None,
        },
        resource_group: args.rg,
        env: args.env,
        services_file: args.services_file,
        dry_run: args.dry_run,
        environment_name: None,
    })?;

    let cancel = utils::cancel_on_ctrl_c();
    commands::deploy::handle(&config, cancel).await
}

impl RegistryArgs {
    fn into_config(self) -> capflow_config::RegistryConfig {
        capflow_config::RegistryConfig {
            server: self.registry_server,
            acr_name: self.acr_name,
            username: self.registry_username,
            password: self.registry_password,
        }
    }
}
