use crate::utils;
use capflow_cloud::CommandRunner;
use capflow_cloud_azure::{AzCli, AzureError, CreateApp, RegistryAuth, env_name_from_id};
use capflow_config::DeployConfig;
use capflow_core::{DeployTarget, ServiceManifest, image_reference};
use colored::Colorize;

/// Creates the Container Apps of the selected services that do not exist
/// yet, then wires their identity to the registry.
pub async fn handle(config: &DeployConfig) -> anyhow::Result<()> {
    let manifest = utils::load_manifest(&config.services_file)?;
    if manifest.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    let az = AzCli::new(
        CommandRunner::process(config.dry_run),
        config.resource_group.as_str(),
    );
    provision(&az, &manifest, config).await
}

async fn provision(az: &AzCli, manifest: &ServiceManifest, config: &DeployConfig) -> anyhow::Result<()> {
    let env_name = match &config.environment_name {
        Some(name) => name.clone(),
        None => resolve_environment(az, manifest, &config.env).await?,
    };

    let selection = capflow_core::select_deploy_targets(manifest, &config.env)?;
    let mut to_create: Vec<&DeployTarget> = Vec::new();
    for target in &selection.targets {
        if az.environment_id(&target.app_name).await.is_some() {
            println!("Exists: {}", target.app_name);
        } else {
            to_create.push(target);
        }
    }
    if to_create.is_empty() {
        println!("No new Container Apps to create.");
    }

    let acr_id = match config.registry.acr_name() {
        Some(acr_name) => {
            let id = az.acr_id(acr_name).await?;
            if !config.dry_run && id.is_empty() {
                return Err(AzureError::RegistryIdUnresolved(acr_name.to_string()).into());
            }
            Some(id).filter(|id| !id.is_empty())
        }
        None => None,
    };

    let registry = &config.registry;
    let auth = match registry.credentials() {
        Some((username, password)) => RegistryAuth::Credentials {
            server: registry.host(),
            username,
            password,
        },
        None => RegistryAuth::SystemIdentity {
            server: &registry.server,
        },
    };

    for target in &to_create {
        let image = image_reference(&registry.server, &target.repo, &config.tag);
        println!("Creating {} -> {}", target.name.cyan(), target.app_name);
        az.create_app(&CreateApp {
            app: &target.app_name,
            environment: &env_name,
            image: &image,
            registry: auth,
            env_vars: &target.env_vars,
        })
        .await?;
    }

    // identity pulls: assign identity, point the registry at it, grant acrpull
    if !config.dry_run && registry.credentials().is_none() {
        for target in &to_create {
            let app = target.app_name.as_str();
            az.assign_system_identity(app).await?;
            az.set_registry_identity(app, registry.host()).await?;
            let principal_id = az.principal_id(app).await?;
            match (principal_id.is_empty(), &acr_id) {
                (false, Some(scope)) => az.ensure_acr_pull(&principal_id, scope).await?,
                _ => tracing::warn!(app, "Skipping acrpull assignment (no principal or registry id)"),
            }
        }
    }

    println!(
        "{}",
        format!("✓ Provisioned {} Container Apps", to_create.len())
            .green()
            .bold()
    );
    Ok(())
}

/// Managed environment name, taken from the first selectable app that
/// already exists.
async fn resolve_environment(
    az: &AzCli,
    manifest: &ServiceManifest,
    env: &str,
) -> anyhow::Result<String> {
    for (_, svc) in manifest.iter() {
        let Some(spec) = svc.deploy_for(env) else {
            continue;
        };
        let app = spec.app_name();
        if spec.skip || app.is_empty() {
            continue;
        }
        let Some(env_id) = az.environment_id(app).await else {
            continue;
        };
        if let Some(name) = env_name_from_id(&env_id) {
            println!("Resolved environment from {}: {}", app, name);
            return Ok(name.to_string());
        }
    }
    Err(AzureError::EnvironmentUnresolved.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capflow_cloud::CommandOutput;
    use capflow_cloud::testing::ScriptedExecutor;
    use capflow_config::{Action, RegistryConfig};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    const ENV_ID: &str =
        "/subscriptions/0000/resourceGroups/rg-dev/providers/Microsoft.App/managedEnvironments/cae-dev";

    fn manifest() -> ServiceManifest {
        capflow_core::parse_manifest(
            r#"{"services": {
                "api": {"repo": "api", "deploy": {"dev": {"appName": "api-dev"}}},
                "web": {"repo": "web", "deploy": {"dev": {"appName": "web-dev", "envVars": "A=1"}}}
            }}"#,
            Path::new("services.json"),
        )
        .unwrap()
    }

    fn config(username: Option<&str>, password: Option<&str>) -> DeployConfig {
        DeployConfig {
            action: Action::Deploy,
            tag: "v1".into(),
            registry: RegistryConfig {
                server: "myacr.azurecr.io".into(),
                acr_name: Some("myacr".into()),
                username: username.map(Into::into),
                password: password.map(Into::into),
            },
            resource_group: "rg-dev".into(),
            env: "dev".into(),
            services_file: PathBuf::from("services.json"),
            dry_run: false,
            environment_name: None,
        }
    }

    fn executor() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .on("--name api-dev --resource-group rg-dev --query properties.managedEnvironmentId", [
                CommandOutput::ok(ENV_ID),
            ])
            .on("--name web-dev --resource-group rg-dev --query properties.managedEnvironmentId", [
                CommandOutput::failed(3, "ResourceNotFound"),
            ])
            .on("acr show", [CommandOutput::ok("/subscriptions/0000/registries/myacr")])
            .on("identity.principalId", [CommandOutput::ok("pid-1")])
    }

    #[tokio::test]
    async fn test_creates_only_missing_apps_with_identity() {
        let executor = Arc::new(executor());
        let az = AzCli::new(CommandRunner::new(executor.clone(), false), "rg-dev");

        provision(&az, &manifest(), &config(None, None)).await.unwrap();

        let creates = executor.calls_matching("containerapp create");
        assert_eq!(creates.len(), 1);
        let line = creates[0].to_string();
        assert!(line.contains("--name web-dev"));
        assert!(line.contains("--environment cae-dev"));
        assert!(line.contains("--image myacr.azurecr.io/web:v1"));
        assert!(line.contains("--registry-identity system"));
        assert!(line.ends_with("--env-vars 'A=1'"));

        assert_eq!(executor.calls_matching("identity assign --system-assigned --name web-dev").len(), 1);
        assert_eq!(executor.calls_matching("registry set --name web-dev").len(), 1);
        let grants = executor.calls_matching("role assignment create");
        assert_eq!(grants.len(), 1);
        assert!(grants[0].to_string().contains("--assignee-object-id pid-1"));
    }

    #[tokio::test]
    async fn test_credentials_skip_identity_wiring() {
        let executor = Arc::new(executor());
        let az = AzCli::new(CommandRunner::new(executor.clone(), false), "rg-dev");

        provision(&az, &manifest(), &config(Some("bot"), Some("hunter2")))
            .await
            .unwrap();

        let creates = executor.calls_matching("containerapp create");
        assert!(creates[0].to_string().contains("--registry-username bot --registry-password '***'"));
        assert!(executor.calls_matching("identity assign").is_empty());
        assert!(executor.calls_matching("role assignment").is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_environment_fails() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("managedEnvironmentId", [CommandOutput::failed(3, "ResourceNotFound")]),
        );
        let az = AzCli::new(CommandRunner::new(executor.clone(), false), "rg-dev");

        let err = provision(&az, &manifest(), &config(None, None)).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AzureError>(),
            Some(AzureError::EnvironmentUnresolved)
        ));
        assert!(executor.calls_matching("containerapp create").is_empty());
    }

    #[tokio::test]
    async fn test_explicit_env_name_in_dry_run() {
        let executor = Arc::new(ScriptedExecutor::new());
        let az = AzCli::new(CommandRunner::new(executor.clone(), true), "rg-dev");
        let mut config = config(None, None);
        config.dry_run = true;
        config.environment_name = Some("cae-dev".into());

        provision(&az, &manifest(), &config).await.unwrap();

        assert!(executor.calls().is_empty());
    }
}
