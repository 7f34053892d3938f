//! The asset registry: configuration, registered roots and lookup tables.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tables::{AssetEntry, PathTables};
use std::path::{Path, PathBuf};
use tracing::info;

/// Maps logical asset paths to public URLs and public paths to files on disk.
///
/// A registry is populated by [`Registry::add`] (one scan per root) or by
/// [`Registry::from_manifest`]. Its configuration never changes after
/// construction; [`Registry::reconfigured`] builds a replacement instead.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub(crate) config: Config,
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) tables: PathTables,
    pub(crate) manifest: Option<PathBuf>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(config: Config) -> Self {
        Self {
            config: config.normalized(),
            ..Self::default()
        }
    }

    /// Create a registry and scan each root in order.
    pub fn with_roots<I, P>(config: Config, roots: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut registry = Self::new(config);
        for root in roots {
            registry.add(root)?;
        }
        Ok(registry)
    }

    /// Build a fresh registry under `config` by replaying every registered root.
    ///
    /// `self` is left untouched; on error nothing is returned to swap in.
    pub fn reconfigured(&self, config: Config) -> Result<Self> {
        if let Some(ref manifest) = self.manifest {
            return Err(Error::manifest_backed(manifest));
        }

        let registry = Self::with_roots(config, &self.roots)?;
        info!(roots = registry.roots.len(), "rebuilt registry");
        Ok(registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registered roots, in registration order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn tables(&self) -> &PathTables {
        &self.tables
    }

    /// Manifest this registry was bootstrapped from, if any.
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Public path for a logical path, without hostname or prefix.
    pub fn public_path(&self, logical: &str) -> Option<&str> {
        self.tables.resolve_public(logical)
    }

    /// Physical location for a public path.
    pub fn physical_path(&self, public: &str) -> Option<&Path> {
        self.tables.resolve_physical(public)
    }

    /// URL for a logical path, for use in templates.
    ///
    /// Joins the CDN hostname, the URL prefix and the public path. Without a
    /// hostname the result is root-relative. Unmapped paths render as an
    /// empty string.
    pub fn asset_path(&self, logical: &str) -> String {
        let Some(public) = self.public_path(logical) else {
            return String::new();
        };

        let hostname = self.config.hostname.trim_end_matches('/');
        let mut parts = Vec::with_capacity(3);
        if !hostname.is_empty() {
            parts.push(hostname);
        }
        if !self.config.url_prefix.is_empty() {
            parts.push(self.config.url_prefix.as_str());
        }
        parts.push(public);

        if hostname.is_empty() {
            format!("/{}", parts.join("/"))
        } else {
            parts.join("/")
        }
    }

    /// Subresource Integrity attribute value for a logical path.
    ///
    /// Empty unless both fingerprinting and integrity are enabled and the
    /// path was scanned.
    pub fn integrity(&self, logical: &str) -> String {
        if !self.config.integrity || !self.config.fingerprint {
            return String::new();
        }

        self.tables
            .integrity_digest(logical)
            .map(|digest| self.config.integrity_algorithm.tag(digest))
            .unwrap_or_default()
    }

    /// All mapped assets, sorted by logical path.
    pub fn entries(&self) -> Vec<AssetEntry> {
        self.tables.entries()
    }
}
