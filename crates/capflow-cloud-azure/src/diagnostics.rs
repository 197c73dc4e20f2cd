//! Best-effort state dump printed when an update fails

use crate::az::AzCli;
use std::fmt;

const UNAVAILABLE: &str = "unavailable";

const REVISION_LIST_QUERY: &str =
    "[].{name:name, active:properties.active, health:properties.healthState, running:properties.runningState}";

/// What could be read about an app. Each part is `None` when its query
/// failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub app: String,
    pub provisioning_state: Option<String>,
    pub running_status: Option<String>,
    pub latest_revision: Option<String>,
    pub latest_ready_revision: Option<String>,
    pub revisions: Option<String>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn part(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or(UNAVAILABLE)
        }

        writeln!(f, "Diagnostics for {}:", self.app)?;
        writeln!(f, "  provisioningState: {}", part(&self.provisioning_state))?;
        writeln!(f, "  runningStatus: {}", part(&self.running_status))?;
        writeln!(f, "  latestRevision: {}", part(&self.latest_revision))?;
        writeln!(f, "  latestReadyRevision: {}", part(&self.latest_ready_revision))?;
        write!(f, "  revisions:")?;
        match &self.revisions {
            Some(table) => {
                for line in table.lines() {
                    write!(f, "\n    {}", line)?;
                }
                Ok(())
            }
            None => write!(f, " {}", UNAVAILABLE),
        }
    }
}

impl AzCli {
    /// Collects a [`Diagnostics`] snapshot. Never fails.
    pub async fn diagnostics(&self, app: &str) -> Diagnostics {
        let revisions = self
            .containerapp(["revision", "list"], app)
            .args(["--query", REVISION_LIST_QUERY, "-o", "table"]);

        Diagnostics {
            app: app.to_string(),
            provisioning_state: self.show_field(app, "properties.provisioningState").await,
            running_status: self.show_field(app, "properties.runningStatus").await,
            latest_revision: self.show_field(app, "properties.latestRevisionName").await,
            latest_ready_revision: self
                .show_field(app, "properties.latestReadyRevisionName")
                .await,
            revisions: self.best_effort(self.runner().query(&revisions).await),
        }
    }

    async fn show_field(&self, app: &str, query: &str) -> Option<String> {
        let result = self.runner().query(&self.show_query(app, query)).await;
        self.best_effort(result)
    }

    fn best_effort(&self, result: capflow_cloud::Result<String>) -> Option<String> {
        match result {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Diagnostic query failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capflow_cloud::testing::ScriptedExecutor;
    use capflow_cloud::{CommandOutput, CommandRunner};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failed_parts_are_unavailable() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("provisioningState", [CommandOutput::ok("Failed\n")])
                .on("runningStatus", [CommandOutput::failed(1, "boom")])
                .on("latestRevisionName", [CommandOutput::ok("api--r2")])
                .on("latestReadyRevisionName", [CommandOutput::ok("")])
                .on("revision list", [CommandOutput::ok("Name    Active\napi--r2 True")]),
        );
        let az = AzCli::new(CommandRunner::new(executor.clone(), false), "rg");

        let diag = az.diagnostics("api").await;
        assert_eq!(diag.provisioning_state.as_deref(), Some("Failed"));
        assert_eq!(diag.running_status, None);
        assert_eq!(diag.latest_revision.as_deref(), Some("api--r2"));
        assert_eq!(diag.latest_ready_revision, None);

        let text = diag.to_string();
        assert!(text.contains("runningStatus: unavailable"));
        assert!(text.contains("    api--r2 True"));
        assert_eq!(executor.calls().len(), 5);
    }

    #[test]
    fn test_display_without_revisions() {
        let diag = Diagnostics {
            app: "api".into(),
            ..Default::default()
        };
        assert!(diag.to_string().ends_with("revisions: unavailable"));
    }
}
