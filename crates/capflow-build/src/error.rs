use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid image tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("Registry login needs both username and password ({missing} is missing)")]
    MissingCredentials { missing: &'static str },

    #[error("Command error: {0}")]
    Cloud(#[from] capflow_cloud::CloudError),
}

impl BuildError {
    /// Message with a hint for the user.
    pub fn user_message(&self) -> String {
        match self {
            BuildError::InvalidTag { tag, reason } => format!(
                "Invalid image tag '{}': {}\n\
                 \n\
                 Tags are at most 128 characters of [A-Za-z0-9._-]\n\
                 and must not start with '.' or '-'.",
                tag, reason
            ),
            BuildError::MissingCredentials { missing } => format!(
                "Registry {} is missing.\n\
                 \n\
                 Pass both --registry-username and --registry-password,\n\
                 or neither to log in with --acr-name.",
                missing
            ),
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
