//! Registry configuration.

use crate::hash::{FingerprintAlgorithm, IntegrityAlgorithm};
use std::fmt;
use std::fs::Metadata;
use std::path::Path;
use std::sync::Arc;

/// Name of the cache subdirectory created inside every scanned root.
pub const CACHE_DIR_NAME: &str = "assettube";

/// Eligibility predicate over a file's path (relative to its root) and metadata.
#[derive(Clone)]
pub struct Matcher(Arc<dyn Fn(&Path, &Metadata) -> bool + Send + Sync>);

impl Matcher {
    /// Wrap a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Path, &Metadata) -> bool + Send + Sync + 'static,
    {
        Matcher(Arc::new(predicate))
    }

    /// Match files whose name ends in one of the given extensions (without the dot).
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes: Vec<String> = extensions
            .into_iter()
            .map(|ext| format!(".{}", ext.as_ref().trim_start_matches('.')))
            .collect();

        Matcher::new(move |path, _| {
            path.to_str()
                .is_some_and(|p| suffixes.iter().any(|suffix| p.ends_with(suffix.as_str())))
        })
    }

    /// Evaluate the predicate.
    pub fn matches(&self, path: &Path, metadata: &Metadata) -> bool {
        (self.0)(path, metadata)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::extensions(["js", "css"])
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Matcher(..)")
    }
}

/// Immutable registry settings.
///
/// A live registry never has its configuration changed in place; see
/// [`AssetTube::reconfigure`](crate::AssetTube::reconfigure).
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Copy eligible files into the cache directory under fingerprinted names.
    pub fingerprint: bool,
    /// Mount prefix of the serving endpoint, e.g. `assets`.
    pub url_prefix: String,
    /// CDN hostname, e.g. `https://cdn.example.com`.
    pub hostname: String,
    /// Decides which files are fingerprinted and served in fingerprint mode.
    pub matcher: Matcher,
    /// Compute Subresource Integrity digests for cached files.
    pub integrity: bool,
    /// Digest used for `integrity` attribute values.
    pub integrity_algorithm: IntegrityAlgorithm,
    /// Digest spliced into fingerprinted file names.
    pub fingerprint_algorithm: FingerprintAlgorithm,
}

impl Config {
    /// Enable or disable fingerprinted cache copies.
    pub fn with_fingerprint(mut self, fingerprint: bool) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Set the mount prefix; surrounding slashes are ignored.
    pub fn with_url_prefix(mut self, url_prefix: impl Into<String>) -> Self {
        self.url_prefix = url_prefix.into();
        self
    }

    /// Set the CDN hostname prepended to rendered URLs.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Replace the eligibility predicate.
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Enable integrity digests computed with `algorithm`.
    pub fn with_integrity(mut self, algorithm: IntegrityAlgorithm) -> Self {
        self.integrity = true;
        self.integrity_algorithm = algorithm;
        self
    }

    /// Choose the digest spliced into fingerprinted names.
    pub fn with_fingerprint_algorithm(mut self, algorithm: FingerprintAlgorithm) -> Self {
        self.fingerprint_algorithm = algorithm;
        self
    }

    /// Strip surrounding slashes from the URL prefix.
    pub(crate) fn normalized(mut self) -> Self {
        self.url_prefix = self.url_prefix.trim_matches('/').to_string();
        self
    }
}
