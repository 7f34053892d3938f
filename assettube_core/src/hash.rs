//! Content digests: filename fingerprints and Subresource Integrity hashes.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Fast digest used to fingerprint public filenames.
///
/// Only needs to change when content changes; it is not a security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintAlgorithm {
    /// MD5, 32 hex characters.
    #[default]
    Md5,
    /// BLAKE3 with 256-bit output, 64 hex characters.
    Blake3,
}

impl FingerprintAlgorithm {
    /// Returns the string representation of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintAlgorithm::Md5 => "md5",
            FingerprintAlgorithm::Blake3 => "blake3",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "md5" => Ok(FingerprintAlgorithm::Md5),
            "blake3" => Ok(FingerprintAlgorithm::Blake3),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Hex digest of `data`.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            FingerprintAlgorithm::Md5 => format!("{:x}", md5::compute(data)),
            FingerprintAlgorithm::Blake3 => hex::encode(blake3::hash(data).as_bytes()),
        }
    }
}

/// Digest used for the Subresource Integrity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrityAlgorithm {
    Sha256,
    #[default]
    Sha384,
    Sha512,
}

impl IntegrityAlgorithm {
    /// Returns the SRI prefix of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityAlgorithm::Sha256 => "sha256",
            IntegrityAlgorithm::Sha384 => "sha384",
            IntegrityAlgorithm::Sha512 => "sha512",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(IntegrityAlgorithm::Sha256),
            "sha384" => Ok(IntegrityAlgorithm::Sha384),
            "sha512" => Ok(IntegrityAlgorithm::Sha512),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Base64 digest of `data` (standard alphabet, no padding).
    pub fn base64_digest(&self, data: &[u8]) -> String {
        match self {
            IntegrityAlgorithm::Sha256 => STANDARD_NO_PAD.encode(Sha256::digest(data)),
            IntegrityAlgorithm::Sha384 => STANDARD_NO_PAD.encode(Sha384::digest(data)),
            IntegrityAlgorithm::Sha512 => STANDARD_NO_PAD.encode(Sha512::digest(data)),
        }
    }

    /// Render an `integrity` attribute value: `<algo>-<base64>`.
    pub fn tag(&self, encoded: &str) -> String {
        format!("{}-{}", self.as_str(), encoded)
    }
}

/// Splice `digest` between the base name and extension of the last segment.
///
/// `js/app.js` becomes `js/app.<digest>.js`. Names without an extension
/// (including dotfiles such as `.babelrc`) are returned unchanged.
pub fn fingerprinted_name(name: &str, digest: &str) -> String {
    let (dir, file) = match name.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, name),
    };

    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            let file = format!("{stem}.{digest}.{ext}");
            match dir {
                Some(dir) => format!("{dir}/{file}"),
                None => file,
            }
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &[u8] = b"var code = 'test';\n";

    #[test]
    fn test_md5_hex_digest() {
        let hex = FingerprintAlgorithm::Md5.hex_digest(SCRIPT);
        assert_eq!(hex, "bf5a6a7119046d97ee509d017080c6aa");
    }

    #[test]
    fn test_blake3_hex_digest_length() {
        let hex = FingerprintAlgorithm::Blake3.hex_digest(SCRIPT);
        assert_eq!(hex.len(), 64);
        assert_ne!(hex, FingerprintAlgorithm::Md5.hex_digest(SCRIPT));
    }

    #[test]
    fn test_integrity_digests() {
        assert_eq!(
            IntegrityAlgorithm::Sha256.base64_digest(SCRIPT),
            "SL26kEvgITkJ8LPt+PRkoMVC8sHpW9OuvMheqtxMU68"
        );
        assert_eq!(
            IntegrityAlgorithm::Sha384.base64_digest(SCRIPT),
            "ikdSg6BDd7ZQH0wpe7EtsWSf4DDnkWmgulB70NrXja4doy1lTsql2ajoHay1xkiu"
        );
        assert_eq!(
            IntegrityAlgorithm::Sha512.base64_digest(SCRIPT),
            "ju5jHaaN+e9x7kaWXjRO8fgoYCzKsw7lAzY3uzpjSAF3FJsKoIYAhvZ6Plxp5hgFyu0ho7a7U6mAWxcvKrC+Dw"
        );
    }

    #[test]
    fn test_integrity_digests_unpadded() {
        for (algo, len) in [
            (IntegrityAlgorithm::Sha256, 43),
            (IntegrityAlgorithm::Sha384, 64),
            (IntegrityAlgorithm::Sha512, 86),
        ] {
            let encoded = algo.base64_digest(SCRIPT);
            assert_eq!(encoded.len(), len, "{}", algo.as_str());
            assert!(!encoded.ends_with('='), "{}", algo.as_str());
        }
    }

    #[test]
    fn test_integrity_tag() {
        let tag = IntegrityAlgorithm::Sha384.tag("abc");
        assert_eq!(tag, "sha384-abc");
    }

    #[test]
    fn test_algorithm_conversions() {
        for algo in [
            IntegrityAlgorithm::Sha256,
            IntegrityAlgorithm::Sha384,
            IntegrityAlgorithm::Sha512,
        ] {
            assert_eq!(IntegrityAlgorithm::parse(algo.as_str()).unwrap(), algo);
        }
        for algo in [FingerprintAlgorithm::Md5, FingerprintAlgorithm::Blake3] {
            assert_eq!(FingerprintAlgorithm::parse(algo.as_str()).unwrap(), algo);
        }

        assert!(IntegrityAlgorithm::parse("md5").is_err());
        assert!(FingerprintAlgorithm::parse("sha1").is_err());
        assert_eq!(IntegrityAlgorithm::default(), IntegrityAlgorithm::Sha384);
        assert_eq!(FingerprintAlgorithm::default(), FingerprintAlgorithm::Md5);
    }

    #[test]
    fn test_fingerprinted_name() {
        assert_eq!(fingerprinted_name("js/app.js", "abc"), "js/app.abc.js");
        assert_eq!(fingerprinted_name("app.css", "abc"), "app.abc.css");
        assert_eq!(
            fingerprinted_name("vendor/lib.min.js", "abc"),
            "vendor/lib.min.abc.js"
        );
    }

    #[test]
    fn test_fingerprinted_name_without_extension() {
        assert_eq!(fingerprinted_name("LICENSE", "abc"), "LICENSE");
        assert_eq!(fingerprinted_name("js/.babelrc", "abc"), "js/.babelrc");
        assert_eq!(fingerprinted_name("v1.2/README", "abc"), "v1.2/README");
        assert_eq!(fingerprinted_name("trailing.", "abc"), "trailing.");
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Same content always yields the same fingerprint
        #[test]
        fn prop_fingerprint_deterministic(data: Vec<u8>) {
            let algo = FingerprintAlgorithm::Md5;
            prop_assert_eq!(algo.hex_digest(&data), algo.hex_digest(&data));
        }

        /// A one-byte change yields a different fingerprint
        #[test]
        fn prop_fingerprint_changes_with_content(
            data in prop::collection::vec(any::<u8>(), 1..256),
            idx in any::<usize>(),
        ) {
            let mut data = data;
            let before = FingerprintAlgorithm::Md5.hex_digest(&data);
            let i = idx % data.len();
            data[i] = data[i].wrapping_add(1);
            prop_assert_ne!(before, FingerprintAlgorithm::Md5.hex_digest(&data));
        }

        /// Splicing keeps directory, stem and extension intact
        #[test]
        fn prop_splice_preserves_parts(
            dir in "[a-z]{1,8}",
            stem in "[a-z]{1,8}",
            ext in "[a-z]{1,4}",
            digest in "[0-9a-f]{32}",
        ) {
            let name = format!("{dir}/{stem}.{ext}");
            let spliced = fingerprinted_name(&name, &digest);
            prop_assert_eq!(spliced, format!("{dir}/{stem}.{digest}.{ext}"));
        }
    }
}
