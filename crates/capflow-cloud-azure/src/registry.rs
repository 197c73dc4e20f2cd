//! Azure Container Registry operations and the tag pre-flight

use crate::az::{AzCli, az};
use crate::error::{AzureError, Result};
use capflow_cloud::CloudError;

/// stderr markers of an already existing role assignment, lower-cased
const ROLE_ASSIGNMENT_EXISTS: [&str; 2] = ["roleassignmentexists", "already exists"];

impl AzCli {
    pub async fn acr_login(&self, acr_name: &str) -> Result<()> {
        self.runner()
            .run(&az(["acr", "login", "--name", acr_name]))
            .await?;
        Ok(())
    }

    /// Whether `repository` in `acr_name` carries `tag`.
    pub async fn tag_exists(&self, acr_name: &str, repository: &str, tag: &str) -> Result<bool> {
        let query = format!("contains(@, '{}')", tag);
        let cmd = az(["acr", "repository", "show-tags"]).args([
            "--name",
            acr_name,
            "--repository",
            repository,
            "--query",
            query.as_str(),
            "-o",
            "tsv",
        ]);
        let out = self.runner().query(&cmd).await?;
        Ok(out == "true")
    }

    /// Prints the 20 most recent tags of `repository`.
    pub async fn print_recent_tags(&self, acr_name: &str, repository: &str) -> Result<()> {
        let cmd = az(["acr", "repository", "show-tags"]).args([
            "--name",
            acr_name,
            "--repository",
            repository,
            "--top",
            "20",
        ]);
        let out = self.runner().query(&cmd).await?;
        if !out.is_empty() {
            println!("{}", out);
        }
        Ok(())
    }

    /// Resource id of the registry. Empty in dry-run.
    pub async fn acr_id(&self, acr_name: &str) -> Result<String> {
        let cmd = az(["acr", "show", "--name", acr_name, "--query", "id", "-o", "tsv"]);
        Ok(self.runner().capture(&cmd).await?)
    }

    /// Grants `acrpull` on `scope` to a service principal.
    ///
    /// An assignment that already exists counts as success.
    pub async fn ensure_acr_pull(&self, principal_id: &str, scope: &str) -> Result<()> {
        let cmd = az(["role", "assignment", "create"]).args([
            "--assignee-object-id",
            principal_id,
            "--assignee-principal-type",
            "ServicePrincipal",
            "--role",
            "acrpull",
            "--scope",
            scope,
        ]);
        let output = self.runner().output(&cmd).await?;
        if output.success() {
            return Ok(());
        }

        let stderr = output.stderr.to_lowercase();
        if ROLE_ASSIGNMENT_EXISTS.iter().any(|m| stderr.contains(m)) {
            tracing::info!(principal_id, "acrpull role assignment already exists");
            return Ok(());
        }

        Err(CloudError::CommandFailed {
            command: cmd.to_string(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        }
        .into())
    }

    /// Checks that every repository carries `tag` before anything is
    /// updated.
    ///
    /// All repositories are checked so the error lists every missing one.
    /// A repository whose tag query fails counts as missing. Recent tags of a missing repository are printed on a best-effort
    /// basis.
    pub async fn verify_tags<'a, I>(&self, acr_name: &str, repositories: I, tag: &str) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing = Vec::new();

        for repo in repositories {
            println!("Checking tag in repository: {}", repo);
            match self.tag_exists(acr_name, repo, tag).await {
                Ok(true) => continue,
                Ok(false) => {}
                // usually RepositoryNotFound: the image was never pushed
                Err(e) => {
                    tracing::warn!(repository = repo, error = %e, "Tag query failed");
                }
            }

            eprintln!("ERROR: tag {} not found in repository {}", tag, repo);
            println!("Available tags (top 20):");
            if let Err(e) = self.print_recent_tags(acr_name, repo).await {
                tracing::warn!(repository = repo, error = %e, "Could not list tags");
            }
            missing.push(repo.to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AzureError::TagNotFoundInRegistry {
                tag: tag.to_string(),
                repositories: missing,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capflow_cloud::testing::ScriptedExecutor;
    use capflow_cloud::{CommandOutput, CommandRunner};
    use std::sync::Arc;

    fn cli(executor: &Arc<ScriptedExecutor>) -> AzCli {
        AzCli::new(CommandRunner::new(executor.clone(), false), "rg")
    }

    #[tokio::test]
    async fn test_tag_exists_query() {
        let executor = Arc::new(ScriptedExecutor::new().on("show-tags", [CommandOutput::ok("true\n")]));
        assert!(cli(&executor).tag_exists("myacr", "api", "v1").await.unwrap());
        let call = &executor.calls()[0];
        assert!(call.to_string().starts_with("az acr repository show-tags --name myacr --repository api"));
        assert_eq!(
            call.arguments()[7..],
            ["--query", "contains(@, 'v1')", "-o", "tsv"]
        );
    }

    #[tokio::test]
    async fn test_verify_tags_reports_every_missing_repository() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("--repository api --query", [CommandOutput::ok("false")])
                .on("--repository web --query", [CommandOutput::ok("true")])
                .on("--repository worker --query", [CommandOutput::ok("false")])
                .on("--top 20", [CommandOutput::failed(1, "boom")]),
        );

        let err = cli(&executor)
            .verify_tags("myacr", ["api", "web", "worker"], "v9")
            .await
            .unwrap_err();

        match err {
            AzureError::TagNotFoundInRegistry { tag, repositories } => {
                assert_eq!(tag, "v9");
                assert_eq!(repositories, vec!["api", "worker"]);
            }
            other => panic!("expected TagNotFoundInRegistry, got {:?}", other),
        }
        assert_eq!(executor.calls_matching("--top 20").len(), 2);
    }

    #[tokio::test]
    async fn test_verify_tags_counts_failed_query_as_missing() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on(
                    "--repository newsvc --query",
                    [CommandOutput::failed(3, "ERROR: (RepositoryNotFound) newsvc")],
                )
                .on("--repository worker --query", [CommandOutput::ok("false")]),
        );

        let err = cli(&executor)
            .verify_tags("myacr", ["newsvc", "worker"], "v9")
            .await
            .unwrap_err();

        match err {
            AzureError::TagNotFoundInRegistry { repositories, .. } => {
                assert_eq!(repositories, vec!["newsvc", "worker"]);
            }
            other => panic!("expected TagNotFoundInRegistry, got {:?}", other),
        }
        assert_eq!(executor.calls_matching("--repository worker --query").len(), 1);
    }

    #[tokio::test]
    async fn test_verify_tags_passes() {
        let executor = Arc::new(ScriptedExecutor::new().on("show-tags", [CommandOutput::ok("true")]));
        cli(&executor)
            .verify_tags("myacr", ["api", "web"], "v1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_role_assignment_already_exists_is_success() {
        for stderr in [
            "ERROR: (RoleAssignmentExists) The role assignment already exists.",
            "conflict: assignment Already Exists",
        ] {
            let executor = Arc::new(
                ScriptedExecutor::new().on("role assignment", [CommandOutput::failed(1, stderr)]),
            );
            cli(&executor)
                .ensure_acr_pull("pid", "/subscriptions/s/registries/myacr")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_role_assignment_other_failure() {
        let executor = Arc::new(
            ScriptedExecutor::new().on("role assignment", [CommandOutput::failed(1, "AuthorizationFailed")]),
        );
        let err = cli(&executor)
            .ensure_acr_pull("pid", "scope")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AzureError::Cloud(CloudError::CommandFailed { exit_code: 1, .. })
        ));
    }
}
