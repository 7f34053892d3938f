//! Precomputed manifests as an alternative to scanning.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::Registry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// A logical -> public mapping produced by a build step.
///
/// ```json
/// {"paths": {"js/app.js": "js/app.1f2e.js"}, "hostname": "", "urlPrefix": "assets"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub url_prefix: String,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read(path)?;
        serde_json::from_slice(&content).map_err(|e| Error::manifest_parse(path, e))
    }
}

impl Registry {
    /// Build a registry from a manifest without scanning or hashing anything.
    ///
    /// Public paths are served from `serve_root`. Hostname and URL prefix
    /// come from the manifest; integrity digests are not available.
    pub fn from_manifest<P, Q>(manifest_path: P, serve_root: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let manifest_path = manifest_path.as_ref();
        let manifest = Manifest::load(manifest_path)?;
        let serve_root = serve_root.as_ref();

        let config = Config::default()
            .with_hostname(manifest.hostname)
            .with_url_prefix(manifest.url_prefix);
        let mut registry = Registry::new(config);
        registry.manifest = Some(manifest_path.to_path_buf());

        for (logical, public) in manifest.paths {
            let physical = serve_root.join(&public);
            registry.tables.insert(logical, public, physical);
        }

        info!(
            manifest = %manifest_path.display(),
            mapped = registry.tables.len(),
            "loaded asset manifest"
        );
        Ok(registry)
    }
}
