//! az CLI wrapper
//!
//! Every Azure operation capflow needs, as `az` invocations run through the
//! shared [`CommandRunner`].

use capflow_cloud::{CommandLine, CommandRunner};

/// az CLI bound to one resource group.
#[derive(Clone)]
pub struct AzCli {
    runner: CommandRunner,
    resource_group: String,
}

impl AzCli {
    pub fn new(runner: CommandRunner, resource_group: impl Into<String>) -> Self {
        Self {
            runner,
            resource_group: resource_group.into(),
        }
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    pub fn is_dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// `az containerapp <sub...> --name APP --resource-group RG`
    pub(crate) fn containerapp<'a>(
        &self,
        subcommand: impl IntoIterator<Item = &'a str>,
        app: &str,
    ) -> CommandLine {
        az(["containerapp"])
            .args(subcommand)
            .args(["--name", app, "--resource-group", self.resource_group.as_str()])
    }

    /// `az containerapp show ... --query QUERY -o tsv`
    pub(crate) fn show_query(&self, app: &str, query: &str) -> CommandLine {
        self.containerapp(["show"], app)
            .args(["--query", query, "-o", "tsv"])
    }
}

pub(crate) fn az<'a>(args: impl IntoIterator<Item = &'a str>) -> CommandLine {
    CommandLine::new("az").args(args)
}
