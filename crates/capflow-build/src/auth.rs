//! Registry login

use crate::error::{BuildError, Result};
use capflow_cloud::{CommandLine, CommandRunner};
use capflow_config::RegistryConfig;

/// How the builder authenticated against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// `docker login HOST -u USER --password-stdin`
    Password,
    /// `az acr login --name ACR`
    AzureCli,
    /// No credentials configured; relies on an existing docker login
    None,
}

/// Logs docker in to the registry.
///
/// Username and password win over the ACR name. The password is fed on
/// stdin and never appears in the logged command line.
pub async fn registry_login(runner: &CommandRunner, registry: &RegistryConfig) -> Result<LoginMethod> {
    let username = non_empty(registry.username.as_deref());
    let password = non_empty(registry.password.as_deref());

    match (username, password) {
        (Some(username), Some(password)) => {
            let cmd = CommandLine::new("docker")
                .args(["login", registry.host(), "-u", username, "--password-stdin"])
                .stdin(password);
            runner.run(&cmd).await?;
            Ok(LoginMethod::Password)
        }
        (Some(_), None) => Err(BuildError::MissingCredentials {
            missing: "password",
        }),
        (None, Some(_)) => Err(BuildError::MissingCredentials {
            missing: "username",
        }),
        (None, None) => match registry.acr_name() {
            Some(acr_name) => {
                let cmd = CommandLine::new("az").args(["acr", "login", "--name", acr_name]);
                runner.run(&cmd).await?;
                Ok(LoginMethod::AzureCli)
            }
            None => {
                tracing::warn!(server = %registry.server, "No registry credentials, skipping login");
                Ok(LoginMethod::None)
            }
        },
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capflow_cloud::testing::ScriptedExecutor;
    use std::sync::Arc;

    fn registry(username: Option<&str>, password: Option<&str>, acr: Option<&str>) -> RegistryConfig {
        RegistryConfig {
            server: "myacr.azurecr.io/team".into(),
            acr_name: acr.map(Into::into),
            username: username.map(Into::into),
            password: password.map(Into::into),
        }
    }

    #[tokio::test]
    async fn test_password_login_uses_stdin() {
        let executor = Arc::new(ScriptedExecutor::new());
        let runner = CommandRunner::new(executor.clone(), false);

        let method = registry_login(&runner, &registry(Some("bot"), Some("hunter2"), Some("myacr")))
            .await
            .unwrap();

        assert_eq!(method, LoginMethod::Password);
        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].to_string(),
            "docker login myacr.azurecr.io -u bot --password-stdin"
        );
        assert_eq!(calls[0].stdin_input(), Some("hunter2"));
    }

    #[tokio::test]
    async fn test_acr_login_fallback() {
        let executor = Arc::new(ScriptedExecutor::new());
        let runner = CommandRunner::new(executor.clone(), false);

        let method = registry_login(&runner, &registry(None, Some(""), Some("myacr")))
            .await
            .unwrap();

        assert_eq!(method, LoginMethod::AzureCli);
        assert_eq!(executor.calls()[0].to_string(), "az acr login --name myacr");
    }

    #[tokio::test]
    async fn test_half_credentials_are_rejected() {
        let runner = CommandRunner::new(Arc::new(ScriptedExecutor::new()), false);
        let err = registry_login(&runner, &registry(Some("bot"), None, Some("myacr")))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingCredentials { missing: "password" }));
    }

    #[tokio::test]
    async fn test_no_credentials_skips_login() {
        let executor = Arc::new(ScriptedExecutor::new());
        let runner = CommandRunner::new(executor.clone(), false);
        let method = registry_login(&runner, &registry(None, None, None)).await.unwrap();
        assert_eq!(method, LoginMethod::None);
        assert!(executor.calls().is_empty());
    }
}
