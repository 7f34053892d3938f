//! Shared registry with atomic replacement.
//!
//! Uses `arc-swap` for lock-free reads. Every write builds a complete
//! replacement registry off to the side and publishes it with one store, so
//! readers see either the old state or the new one, never a partial scan.

use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;
use crate::serve::Resolution;
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tiny_http::Request;
use tracing::info;

/// A live [`Registry`] shared between request handlers and one writer.
#[derive(Debug)]
pub struct AssetTube {
    live: ArcSwap<Registry>,
    writer: Mutex<()>,
}

impl AssetTube {
    /// Create a handle around an empty registry.
    pub fn new(config: Config) -> Self {
        Self::from_registry(Registry::new(config))
    }

    /// Create a handle around an existing registry.
    pub fn from_registry(registry: Registry) -> Self {
        Self {
            live: ArcSwap::from_pointee(registry),
            writer: Mutex::new(()),
        }
    }

    /// Snapshot of the live registry.
    pub fn load(&self) -> Arc<Registry> {
        self.live.load_full()
    }

    /// Scan another root and publish the result.
    ///
    /// On error the live registry is unchanged.
    pub fn add<P: AsRef<Path>>(&self, root: P) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = Registry::clone(&self.live.load());
        next.add(root)?;
        self.live.store(Arc::new(next));
        Ok(())
    }

    /// Replace the registry with one built from `config`, replaying every root.
    ///
    /// All-or-nothing: if any root fails to scan, the live registry is unchanged.
    pub fn reconfigure(&self, config: Config) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let next = self.live.load().reconfigured(config)?;
        let roots: Vec<PathBuf> = next.roots().to_vec();
        self.live.store(Arc::new(next));
        info!(?roots, "reconfigured asset registry");
        Ok(())
    }

    /// See [`Registry::asset_path`].
    pub fn asset_path(&self, logical: &str) -> String {
        self.live.load().asset_path(logical)
    }

    /// See [`Registry::integrity`].
    pub fn integrity(&self, logical: &str) -> String {
        self.live.load().integrity(logical)
    }

    /// See [`Registry::script_tag`].
    pub fn script_tag(&self, logical: &str, attrs: &[(&str, &str)]) -> String {
        self.live.load().script_tag(logical, attrs)
    }

    /// See [`Registry::link_tag`].
    pub fn link_tag(&self, logical: &str, attrs: &[(&str, &str)]) -> String {
        self.live.load().link_tag(logical, attrs)
    }

    /// Resolve a request URL against the live registry.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        match self.live.load().resolve(url) {
            Resolution::Found(physical) => Some(physical.to_path_buf()),
            Resolution::NotFound => None,
        }
    }

    /// Answer a request from the live registry.
    pub fn serve(&self, request: Request) -> Result<()> {
        self.load().serve(request)
    }
}

impl Default for AssetTube {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
