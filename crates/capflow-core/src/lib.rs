//! capflow core
//!
//! The service manifest (`services.json`) model, its loader, and the
//! selection rules that turn a manifest into deploy and build targets.

pub mod error;
pub mod loader;
pub mod model;
pub mod selection;

pub use error::{ManifestError, Result};
pub use loader::{load_manifest, parse_manifest};
pub use model::{
    BuildSpec, DeploySpec, EnvVars, HealthCheckSpec, ServiceDefinition, ServiceManifest,
};
pub use selection::{
    BuildTarget, DeployTarget, Selection, SkipReason, Skipped, image_reference,
    select_build_targets, select_deploy_targets,
};
