//! Container App operations

use crate::az::AzCli;
use crate::error::Result;
use async_trait::async_trait;
use capflow_cloud::{CommandLine, Observation, RetryPolicy, RolloutProbe};

const ROLLOUT_QUERY: &str =
    "[properties.provisioningState, properties.template.containers[0].image]";

/// Registry access for a new app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAuth<'a> {
    /// Admin / token credentials, `server` is the registry host
    Credentials {
        server: &'a str,
        username: &'a str,
        password: &'a str,
    },
    /// The app's system-assigned identity pulls from `server`
    SystemIdentity { server: &'a str },
}

/// Parameters of `az containerapp create`.
#[derive(Debug, Clone)]
pub struct CreateApp<'a> {
    pub app: &'a str,
    pub environment: &'a str,
    pub image: &'a str,
    pub registry: RegistryAuth<'a>,
    pub env_vars: &'a [String],
}

/// Target port new apps expose through external ingress.
pub const DEFAULT_TARGET_PORT: u16 = 8080;

impl AzCli {
    /// `az containerapp update ... --image IMAGE --no-wait [--set-env-vars KV...]`
    pub fn update_command(&self, app: &str, image: &str, env_vars: &[String]) -> CommandLine {
        let mut cmd = self
            .containerapp(["update"], app)
            .args(["--image", image, "--no-wait"]);
        if !env_vars.is_empty() {
            cmd = cmd.arg("--set-env-vars").args(env_vars.iter().cloned());
        }
        cmd
    }

    /// Points the app at a new image without waiting for the revision.
    pub async fn update_image(
        &self,
        app: &str,
        image: &str,
        env_vars: &[String],
        policy: RetryPolicy,
    ) -> Result<()> {
        let cmd = self.update_command(app, image, env_vars);
        self.runner().run_with_retry(&cmd, policy).await?;
        Ok(())
    }

    pub fn create_command(&self, request: &CreateApp<'_>) -> CommandLine {
        let port = DEFAULT_TARGET_PORT.to_string();
        let mut cmd = self.containerapp(["create"], request.app).args([
            "--environment",
            request.environment,
            "--image",
            request.image,
            "--ingress",
            "external",
            "--target-port",
            port.as_str(),
            "--revisions-mode",
            "single",
            "--system-assigned",
        ]);

        cmd = match request.registry {
            RegistryAuth::Credentials {
                server,
                username,
                password,
            } => cmd
                .args([
                    "--registry-server",
                    server,
                    "--registry-username",
                    username,
                    "--registry-password",
                ])
                .secret(password),
            RegistryAuth::SystemIdentity { server } => {
                cmd.args(["--registry-server", server, "--registry-identity", "system"])
            }
        };

        if !request.env_vars.is_empty() {
            cmd = cmd.arg("--env-vars").args(request.env_vars.iter().cloned());
        }
        cmd
    }

    pub async fn create_app(&self, request: &CreateApp<'_>) -> Result<()> {
        self.runner().run(&self.create_command(request)).await?;
        Ok(())
    }

    /// Managed environment id of an existing app.
    ///
    /// `None` when the app does not exist (the query fails) and always in
    /// dry-run, where nothing is queried.
    pub async fn environment_id(&self, app: &str) -> Option<String> {
        let cmd = self.show_query(app, "properties.managedEnvironmentId");
        match self.runner().capture(&cmd).await {
            Ok(id) if !id.is_empty() => Some(id),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(app, error = %e, "App not found");
                None
            }
        }
    }

    pub async fn assign_system_identity(&self, app: &str) -> Result<()> {
        let cmd = self.containerapp(["identity", "assign", "--system-assigned"], app);
        self.runner().run(&cmd).await?;
        Ok(())
    }

    /// Makes the app pull from `server` with its system identity.
    pub async fn set_registry_identity(&self, app: &str, server: &str) -> Result<()> {
        let cmd = self
            .containerapp(["registry", "set"], app)
            .args(["--server", server, "--identity", "system"]);
        self.runner().run(&cmd).await?;
        Ok(())
    }

    pub async fn principal_id(&self, app: &str) -> Result<String> {
        let cmd = self.show_query(app, "identity.principalId");
        Ok(self.runner().capture(&cmd).await?)
    }
}

#[async_trait]
impl RolloutProbe for AzCli {
    async fn observe(&self, app: &str) -> capflow_cloud::Result<Observation> {
        let raw = self.runner().query(&self.show_query(app, ROLLOUT_QUERY)).await?;
        Ok(parse_rollout(&raw))
    }
}

/// Splits `state<TAB>image`; missing columns are empty.
fn parse_rollout(raw: &str) -> Observation {
    let mut parts = raw.trim().split('\t');
    let state = parts.next().unwrap_or_default();
    let image = parts.next().unwrap_or_default();
    Observation::new(state, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capflow_cloud::testing::ScriptedExecutor;
    use capflow_cloud::{CloudError, CommandOutput, CommandRunner};
    use std::sync::Arc;
    use std::time::Duration;

    fn az(executor: &Arc<ScriptedExecutor>, dry_run: bool) -> AzCli {
        AzCli::new(CommandRunner::new(executor.clone(), dry_run), "rg-dev")
    }

    #[test]
    fn test_update_command() {
        let az = az(&Arc::new(ScriptedExecutor::new()), false);
        let env = vec!["A=1".to_string(), "B=two words".to_string()];
        assert_eq!(
            az.update_command("api-dev", "r.io/api:v2", &env).to_string(),
            "az containerapp update --name api-dev --resource-group rg-dev --image r.io/api:v2 --no-wait --set-env-vars 'A=1' 'B=two words'"
        );
        assert_eq!(
            az.update_command("api-dev", "r.io/api:v2", &[]).to_string(),
            "az containerapp update --name api-dev --resource-group rg-dev --image r.io/api:v2 --no-wait"
        );
    }

    #[test]
    fn test_create_command_with_credentials_masks_password() {
        let az = az(&Arc::new(ScriptedExecutor::new()), false);
        let env = vec!["A=1".to_string()];
        let cmd = az.create_command(&CreateApp {
            app: "api-dev",
            environment: "cae-dev",
            image: "r.io/team/api:v1",
            registry: RegistryAuth::Credentials {
                server: "r.io",
                username: "bot",
                password: "hunter2",
            },
            env_vars: &env,
        });
        let line = cmd.to_string();
        assert!(line.starts_with(
            "az containerapp create --name api-dev --resource-group rg-dev --environment cae-dev"
        ));
        assert!(line.contains("--ingress external --target-port 8080 --revisions-mode single --system-assigned"));
        assert!(line.contains("--registry-server r.io --registry-username bot --registry-password '***'"));
        assert!(line.ends_with("--env-vars 'A=1'"));
        assert!(!line.contains("hunter2"));
        assert!(cmd.arguments().iter().any(|a| a == "hunter2"));
    }

    #[test]
    fn test_create_command_with_identity() {
        let az = az(&Arc::new(ScriptedExecutor::new()), false);
        let line = az
            .create_command(&CreateApp {
                app: "api-dev",
                environment: "cae-dev",
                image: "r.io/team/api:v1",
                registry: RegistryAuth::SystemIdentity {
                    server: "r.io/team",
                },
                env_vars: &[],
            })
            .to_string();
        assert!(line.ends_with("--registry-server r.io/team --registry-identity system"));
    }

    #[tokio::test]
    async fn test_update_retries_through_runner() {
        let executor = Arc::new(ScriptedExecutor::new().on(
            "containerapp update",
            [
                CommandOutput::failed(1, "(OperationInProgress)"),
                CommandOutput::ok(""),
            ],
        ));
        az(&executor, false)
            .update_image("api", "r.io/api:v2", &[], RetryPolicy::new(8, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(executor.calls_matching("containerapp update").len(), 2);
    }

    #[tokio::test]
    async fn test_observe_parses_tsv() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("containerapp show", [CommandOutput::ok("Succeeded\tr.io/api:v2\n")]),
        );
        let observation = az(&executor, false).observe("api").await.unwrap();
        assert_eq!(observation, Observation::new("Succeeded", "r.io/api:v2"));
        assert!(executor.calls()[0].to_string().contains("properties.provisioningState"));
    }

    #[tokio::test]
    async fn test_observe_propagates_query_failure() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("containerapp show", [CommandOutput::failed(3, "not found")]),
        );
        let err = az(&executor, false).observe("api").await.unwrap_err();
        assert!(matches!(err, CloudError::CommandFailed { .. }));
    }

    #[test]
    fn test_parse_rollout_missing_columns() {
        assert_eq!(parse_rollout("InProgress"), Observation::new("InProgress", ""));
        assert_eq!(parse_rollout(""), Observation::new("", ""));
    }

    #[tokio::test]
    async fn test_environment_id() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("--name api ", [CommandOutput::ok("/subscriptions/s/managedEnvironments/cae\n")])
                .on("--name web ", [CommandOutput::failed(3, "ResourceNotFound")]),
        );
        let az = az(&executor, false);
        assert_eq!(
            az.environment_id("api").await.as_deref(),
            Some("/subscriptions/s/managedEnvironments/cae")
        );
        assert_eq!(az.environment_id("web").await, None);
    }

    #[tokio::test]
    async fn test_environment_id_not_queried_in_dry_run() {
        let executor = Arc::new(ScriptedExecutor::new());
        assert_eq!(az(&executor, true).environment_id("api").await, None);
        assert!(executor.calls().is_empty());
    }
}
