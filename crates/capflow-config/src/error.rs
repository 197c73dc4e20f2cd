use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "services file not found. Looked in:\n\
        - CAPFLOW_SERVICES_FILE\n\
        - current directory: services.json, pipelines/services.json, .capflow/services.json\n\
        - ~/.config/capflow/services.json\n\
        or pass --services-file"
    )]
    ManifestFileNotFound,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
