//! Directory scanning, fingerprinting and cache population.

use crate::config::CACHE_DIR_NAME;
use crate::error::{Error, Result};
use crate::hash::fingerprinted_name;
use crate::registry::Registry;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

impl Registry {
    /// Add a root to the registry and scan it.
    ///
    /// With fingerprinting enabled, the `assettube` cache directory under the
    /// root is deleted and recreated, and every file accepted by the matcher
    /// is copied into it under a fingerprinted name. Without fingerprinting,
    /// every file maps to itself and is served from the source tree.
    ///
    /// Any I/O error aborts the scan; entries recorded before the failure stay.
    pub fn add<P: AsRef<Path>>(&mut self, root: P) -> Result<()> {
        self.roots.push(root.as_ref().to_path_buf());

        let root = clean(root.as_ref());
        let cache_dir = if self.config.fingerprint {
            let cache_dir = root.join(CACHE_DIR_NAME);
            recreate_dir(&cache_dir)?;
            Some(cache_dir)
        } else {
            None
        };

        let walker = ignore::WalkBuilder::new(&root)
            .standard_filters(false) // Assets are often build outputs that .gitignore excludes
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| !is_cache_dir(entry))
            .build();

        let mut mapped = 0usize;
        for entry in walker {
            let entry = entry?;

            // Skip the root itself
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let relative = path
                .strip_prefix(&root)
                .map_err(|_| Error::invalid_path(path, "not under scanned root"))?;
            let metadata = entry.metadata()?;

            if metadata.is_dir() {
                if let Some(ref cache_dir) = cache_dir {
                    create_mirror_dir(&cache_dir.join(relative), &metadata)?;
                }
                continue;
            }

            if !metadata.is_file() {
                continue;
            }

            let logical = logical_path(relative)?;

            let Some(ref cache_dir) = cache_dir else {
                self.record(logical.clone(), logical, path.to_path_buf());
                mapped += 1;
                continue;
            };

            if !self.config.matcher.matches(relative, &metadata) {
                debug!(path = %logical, "not matched, skipping");
                continue;
            }

            let content = fs::read(path)?;
            let digest = self.config.fingerprint_algorithm.hex_digest(&content);
            let public = fingerprinted_name(&logical, &digest);
            let physical = cache_dir.join(&public);
            write_cache_copy(&physical, &content, &metadata)?;

            self.record(logical.clone(), public, physical);
            if self.config.integrity {
                let encoded = self.config.integrity_algorithm.base64_digest(&content);
                self.tables.insert_integrity(logical, encoded);
            }
            mapped += 1;
        }

        info!(
            root = %root.display(),
            mapped,
            fingerprint = self.config.fingerprint,
            "scanned asset root"
        );
        Ok(())
    }

    fn record(&mut self, logical: String, public: String, physical: PathBuf) {
        debug!(%logical, %public, "mapped asset");
        if let Some(previous) = self.tables.insert(logical.clone(), public, physical) {
            warn!(%logical, %previous, "logical path overwritten by a later root");
        }
    }
}

/// Lexically normalize a root (`./a//b/` becomes `a/b`).
fn clean(root: &Path) -> PathBuf {
    let cleaned: PathBuf = root
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// The cache directory sits directly under the root.
fn is_cache_dir(entry: &ignore::DirEntry) -> bool {
    entry.depth() == 1
        && entry.file_name() == CACHE_DIR_NAME
        && entry.file_type().is_some_and(|t| t.is_dir())
}

/// Convert a root-relative path to a `/`-separated logical path.
fn logical_path(relative: &Path) -> Result<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| Error::invalid_path(relative, "not valid UTF-8"))?;
                segments.push(segment);
            }
            _ => return Err(Error::invalid_path(relative, "unexpected path component")),
        }
    }
    Ok(segments.join("/"))
}

/// Delete whatever sits at `dir`, then create it as an empty directory.
fn recreate_dir(dir: &Path) -> Result<()> {
    match fs::symlink_metadata(dir) {
        Ok(metadata) if metadata.is_dir() => {
            debug!(dir = %dir.display(), "removing previous cache directory");
            fs::remove_dir_all(dir)?;
        }
        // Files and symlinks, including a symlink to a directory
        Ok(_) => {
            debug!(path = %dir.display(), "removing non-directory at cache location");
            fs::remove_file(dir)?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    fs::create_dir(dir)?;
    Ok(())
}

/// Mirror a source directory into the cache, keeping its permissions.
fn create_mirror_dir(dir: &Path, metadata: &fs::Metadata) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        builder.mode(metadata.permissions().mode());
    }
    #[cfg(not(unix))]
    let _ = metadata;

    builder.create(dir)?;
    Ok(())
}

/// Write `content` to `dest` atomically with the source file's permissions.
fn write_cache_copy(dest: &Path, content: &[u8], metadata: &fs::Metadata) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::invalid_path(dest, "cache path has no parent"))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.as_file().set_permissions(metadata.permissions())?;
    temp_file.persist(dest)?;
    Ok(())
}
