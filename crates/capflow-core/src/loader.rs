//! Manifest loader
//!
//! Reads `services.json` into a [`ServiceManifest`], keeping the order in
//! which services appear in the file.

use crate::error::{ManifestError, Result};
use crate::model::{ServiceDefinition, ServiceManifest};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    services: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Loads the manifest at `path`.
///
/// A missing file is [`ManifestError::ManifestNotFound`]. A file without a
/// `services` key (or with an empty one) yields an empty manifest.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_manifest(path: &Path) -> Result<ServiceManifest> {
    if !path.exists() {
        return Err(ManifestError::ManifestNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(bytes = content.len(), "Read services file");

    let manifest = parse_manifest(&content, path)?;
    info!(services = manifest.len(), "Manifest loaded");
    Ok(manifest)
}

/// Parses manifest JSON. `source` is only used in error messages.
pub fn parse_manifest(content: &str, source: &Path) -> Result<ServiceManifest> {
    let parse_error = |message: String| ManifestError::ManifestParse {
        path: source.to_path_buf(),
        message,
    };

    let raw: RawManifest = serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?;

    let mut services = Vec::new();
    for (name, value) in raw.services.unwrap_or_default() {
        let definition: ServiceDefinition = serde_json::from_value(value)
            .map_err(|e| parse_error(format!("service '{}': {}", name, e)))?;
        services.push((name, definition));
    }

    Ok(ServiceManifest::new(services))
}
