//! Azure provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("one or more repositories do not contain tag {tag}: {}", .repositories.join(", "))]
    TagNotFoundInRegistry {
        tag: String,
        repositories: Vec<String>,
    },

    #[error(
        "Could not resolve Container Apps environment name. Provide --env-name or ensure at least one existing app is deployed."
    )]
    EnvironmentUnresolved,

    #[error("Unable to resolve ACR resource id for {0}")]
    RegistryIdUnresolved(String),

    #[error("Cloud error: {0}")]
    Cloud(#[from] capflow_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, AzureError>;
