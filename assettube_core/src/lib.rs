//! # AssetTube Core
//!
//! Content-fingerprinted names and serving for static build artifacts.
//!
//! A [`Registry`] scans one or more asset roots. With fingerprinting enabled,
//! every eligible file is copied into an `assettube` cache directory under a
//! name that embeds a digest of its content (`js/app.js` becomes
//! `js/app.<md5>.js`), so changed content always yields a new URL and old URLs
//! can be cached forever.
//!
//! ## Features
//!
//! - Logical path -> public URL lookup for templates ([`Registry::asset_path`])
//! - Public path -> file resolution for serving ([`Registry::serve`])
//! - Subresource Integrity digests (SHA-256/384/512)
//! - Atomic reconfiguration through [`AssetTube`]
//! - Manifest bootstrap for precomputed mappings
//!
//! ## Example
//!
//! ```no_run
//! use assettube_core::{AssetTube, Config, IntegrityAlgorithm};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = Config::default()
//!     .with_fingerprint(true)
//!     .with_url_prefix("assets")
//!     .with_integrity(IntegrityAlgorithm::Sha384);
//!
//! let tube = AssetTube::new(config);
//! tube.add("./public")?;
//!
//! // "/assets/js/app.<md5>.js"
//! let src = tube.asset_path("js/app.js");
//! let integrity = tube.integrity("js/app.js");
//! println!("<script src=\"{src}\" integrity=\"{integrity}\"></script>");
//!
//! let server = tiny_http::Server::http("127.0.0.1:8080")?;
//! for request in server.incoming_requests() {
//!     tube.serve(request)?;
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handle;
mod hash;
mod html;
mod manifest;
mod registry;
mod scan;
mod serve;
mod tables;

pub use config::{CACHE_DIR_NAME, Config, Matcher};
pub use error::{Error, Result};
pub use handle::AssetTube;
pub use hash::{FingerprintAlgorithm, IntegrityAlgorithm, fingerprinted_name};
pub use manifest::Manifest;
pub use registry::Registry;
pub use serve::Resolution;
pub use tables::{AssetEntry, PathTables};
