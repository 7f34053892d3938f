//! Path mapping tables.
//!
//! Two maps answer every lookup: `logical -> public` renders URLs and
//! `public -> physical` serves bytes. A third keeps SRI digests per logical
//! path. Entries are only ever added by a scan or a manifest load; there is
//! no per-entry update or delete.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One mapped asset, as listed by [`PathTables::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub logical: String,
    pub public: String,
    pub physical: PathBuf,
    /// Base64 digest, without the algorithm prefix.
    pub integrity: Option<String>,
}

/// Lookup tables populated by a scan or a manifest.
#[derive(Debug, Clone, Default)]
pub struct PathTables {
    public: HashMap<String, String>,
    physical: HashMap<String, PathBuf>,
    integrity: HashMap<String, String>,
    /// Public paths that differ from their logical path.
    fingerprinted: HashSet<String>,
}

impl PathTables {
    /// Public path for a logical path.
    pub fn resolve_public(&self, logical: &str) -> Option<&str> {
        self.public.get(logical).map(String::as_str)
    }

    /// Physical location for a public path.
    pub fn resolve_physical(&self, public: &str) -> Option<&Path> {
        self.physical.get(public).map(PathBuf::as_path)
    }

    /// Base64 integrity digest for a logical path.
    pub fn integrity_digest(&self, logical: &str) -> Option<&str> {
        self.integrity.get(logical).map(String::as_str)
    }

    /// Whether a public path embeds a content digest, so its bytes never change.
    pub fn is_fingerprinted(&self, public: &str) -> bool {
        self.fingerprinted.contains(public)
    }

    /// Number of logical paths mapped.
    pub fn len(&self) -> usize {
        self.public.len()
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty()
    }

    /// All mapped assets, sorted by logical path.
    pub fn entries(&self) -> Vec<AssetEntry> {
        let mut entries: Vec<AssetEntry> = self
            .public
            .iter()
            .filter_map(|(logical, public)| {
                let physical = self.physical.get(public)?;
                Some(AssetEntry {
                    logical: logical.clone(),
                    public: public.clone(),
                    physical: physical.clone(),
                    integrity: self.integrity.get(logical).cloned(),
                })
            })
            .collect();

        entries.sort_by(|a, b| a.logical.cmp(&b.logical));
        entries
    }

    /// Record a mapping.
    ///
    /// Returns the previous public path when `logical` was already mapped
    /// (a later root overwriting an earlier one). The stale public entry and
    /// integrity digest are dropped so both tables stay consistent.
    pub(crate) fn insert(
        &mut self,
        logical: String,
        public: String,
        physical: PathBuf,
    ) -> Option<String> {
        let previous = self.public.insert(logical.clone(), public.clone());
        if let Some(ref old) = previous
            && *old != public
        {
            self.physical.remove(old);
            self.fingerprinted.remove(old);
        }
        self.integrity.remove(&logical);
        if public == logical {
            self.fingerprinted.remove(&public);
        } else {
            self.fingerprinted.insert(public.clone());
        }
        self.physical.insert(public, physical);
        previous
    }

    /// Record an integrity digest for an already-mapped logical path.
    pub(crate) fn insert_integrity(&mut self, logical: String, digest: String) {
        self.integrity.insert(logical, digest);
    }
}
