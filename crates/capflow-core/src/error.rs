use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("services file not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("failed to parse services file: {path}\nreason: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("{service} {message} for env={env}")]
    ManifestEntryInvalid {
        service: String,
        env: String,
        message: String,
    },

    #[error("failed to read services file: {path}\nreason: {message}")]
    Io { path: PathBuf, message: String },
}

impl ManifestError {
    /// `ManifestEntryInvalid` for a deploy entry without an app name.
    pub fn missing_app_name(service: &str, env: &str) -> Self {
        ManifestError::ManifestEntryInvalid {
            service: service.to_string(),
            env: env.to_string(),
            message: "missing appName".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
