//! Service definitions

use super::flag;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One entry of the `services` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    /// Registry repository name (e.g. `shop/api`)
    #[serde(default)]
    pub repo: Option<String>,

    /// Excludes the service from every action
    #[serde(default, deserialize_with = "flag::lenient")]
    pub skip: bool,

    #[serde(default)]
    pub build: Option<BuildSpec>,

    /// Deploy configuration per environment name; `null` and `{}` are `None`
    #[serde(default, deserialize_with = "deploy_map")]
    pub deploy: Option<HashMap<String, Option<DeploySpec>>>,
}

impl ServiceDefinition {
    /// Trimmed repository name, empty when unset.
    pub fn repo(&self) -> &str {
        self.repo.as_deref().map(str::trim).unwrap_or("")
    }

    /// Deploy configuration for `env`.
    ///
    /// `null` and `{}` count as "no configuration". Any other object is a
    /// configuration, even one without `appName`.
    pub fn deploy_for(&self, env: &str) -> Option<&DeploySpec> {
        self.deploy.as_ref()?.get(env)?.as_ref()
    }
}

fn deploy_map<'de, D>(
    deserializer: D,
) -> Result<Option<HashMap<String, Option<DeploySpec>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<HashMap<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let mut deploy = HashMap::with_capacity(raw.len());
    for (env, value) in raw {
        let spec = match value {
            Value::Null => None,
            Value::Object(ref fields) if fields.is_empty() => None,
            value => Some(
                DeploySpec::deserialize(value)
                    .map_err(|e| D::Error::custom(format!("deploy.{}: {}", env, e)))?,
            ),
        };
        deploy.insert(env, spec);
    }
    Ok(Some(deploy))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Docker build context, relative to the working directory
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default, deserialize_with = "flag::lenient")]
    pub skip: bool,
}

impl BuildSpec {
    pub fn path(&self) -> &str {
        self.path.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Per-environment deploy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySpec {
    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default, deserialize_with = "flag::lenient")]
    pub skip: bool,

    #[serde(default)]
    pub env_vars: Option<EnvVars>,

    #[serde(default)]
    pub health_check: Option<HealthCheckSpec>,
}

impl DeploySpec {
    /// Trimmed app name, empty when unset.
    pub fn app_name(&self) -> &str {
        self.app_name.as_deref().map(str::trim).unwrap_or("")
    }
}

/// `envVars` is either a list of `KEY=VALUE` strings or one
/// space-delimited string using shell quoting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvVars {
    List(Vec<String>),
    Line(String),
}

impl EnvVars {
    /// Expands into command-line arguments.
    ///
    /// A line is split on shell-word boundaries so quoted values keep
    /// their spaces: `A=1 B="two words"` → `["A=1", "B=two words"]`.
    pub fn to_args(&self) -> Result<Vec<String>, shell_words::ParseError> {
        match self {
            EnvVars::List(items) => Ok(items.clone()),
            EnvVars::Line(line) if line.trim().is_empty() => Ok(Vec::new()),
            EnvVars::Line(line) => shell_words::split(line),
        }
    }
}

/// HTTP health gate run after an app converges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    #[serde(default, deserialize_with = "flag::lenient")]
    pub skip: bool,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_expected_status", deserialize_with = "flag::number")]
    pub expected_status: u16,

    #[serde(default = "default_retries", deserialize_with = "flag::number")]
    pub retries: u32,

    #[serde(default = "default_delay_seconds", deserialize_with = "flag::number")]
    pub delay_seconds: u64,
}

impl HealthCheckSpec {
    pub fn url(&self) -> &str {
        self.url.as_deref().map(str::trim).unwrap_or("")
    }
}

impl Default for HealthCheckSpec {
    fn default() -> Self {
        Self {
            skip: false,
            url: None,
            expected_status: default_expected_status(),
            retries: default_retries(),
            delay_seconds: default_delay_seconds(),
        }
    }
}

fn default_expected_status() -> u16 {
    200
}

fn default_retries() -> u32 {
    12
}

fn default_delay_seconds() -> u64 {
    5
}
