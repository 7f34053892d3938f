use anyhow::{Context, Result};
use assettube_core::{
    AssetTube, Config, FingerprintAlgorithm, IntegrityAlgorithm, Matcher, Registry,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

mod logging;
mod output;

use output::{OutputWriter, ScanOutput};

/// Number of threads answering HTTP requests.
const SERVE_THREADS: usize = 4;

/// AssetTube - fingerprint and serve static assets
#[derive(Parser)]
#[command(name = "assettube")]
#[command(about = "Fingerprint and serve static assets", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan asset roots and list the resulting mappings
    Scan {
        /// Asset root directories, scanned in order
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        #[command(flatten)]
        options: ConfigArgs,
    },

    /// Serve assets over HTTP
    Serve {
        /// Asset root directories, scanned in order
        #[arg(required_unless_present = "manifest")]
        roots: Vec<PathBuf>,

        #[command(flatten)]
        options: ConfigArgs,

        /// Address to listen on
        #[arg(long, env = "ASSETTUBE_ADDR", default_value = "127.0.0.1:8080")]
        addr: String,

        /// Load mappings from a manifest instead of scanning
        #[arg(long, conflicts_with = "roots", requires = "serve_root")]
        manifest: Option<PathBuf>,

        /// Directory that manifest public paths are served from
        #[arg(long)]
        serve_root: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Copy matched files into the cache under fingerprinted names
    #[arg(long)]
    fingerprint: bool,

    /// Mount prefix of the serving endpoint
    #[arg(long, env = "ASSETTUBE_URL_PREFIX", default_value = "")]
    url_prefix: String,

    /// CDN hostname prepended to rendered URLs
    #[arg(long, env = "ASSETTUBE_HOSTNAME", default_value = "")]
    hostname: String,

    /// Extension eligible for fingerprinting (repeatable, default: js and css)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Compute Subresource Integrity digests
    #[arg(long)]
    integrity: bool,

    /// Integrity digest algorithm (sha256, sha384, sha512)
    #[arg(long, default_value = "sha384")]
    algo: String,

    /// Fingerprint digest algorithm (md5, blake3)
    #[arg(long, default_value = "md5")]
    fingerprint_algo: String,
}

impl ConfigArgs {
    fn to_config(&self) -> Result<Config> {
        let mut config = Config::default()
            .with_fingerprint(self.fingerprint)
            .with_url_prefix(self.url_prefix.as_str())
            .with_hostname(self.hostname.as_str())
            .with_fingerprint_algorithm(FingerprintAlgorithm::parse(&self.fingerprint_algo)?);

        if !self.extensions.is_empty() {
            config = config.with_matcher(Matcher::extensions(&self.extensions));
        }
        if self.integrity {
            config = config.with_integrity(IntegrityAlgorithm::parse(&self.algo)?);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let writer = OutputWriter::new(cli.json);
    let result = match cli.command {
        Commands::Scan { roots, options } => cmd_scan(&writer, &roots, &options),
        Commands::Serve {
            roots,
            options,
            addr,
            manifest,
            serve_root,
        } => match manifest {
            Some(manifest) => {
                // clap enforces --serve-root alongside --manifest
                let serve_root = serve_root.unwrap_or_else(|| PathBuf::from("."));
                cmd_serve_manifest(&manifest, &serve_root, &addr)
            }
            None => cmd_serve(&roots, &options, &addr),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            writer.write_error(&e, 1);
            ExitCode::FAILURE
        }
    }
}

fn build_registry(roots: &[PathBuf], options: &ConfigArgs) -> Result<Registry> {
    let config = options.to_config().context("Invalid configuration")?;
    let mut registry = Registry::new(config);
    for root in roots {
        registry
            .add(root)
            .with_context(|| format!("Failed to scan {}", root.display()))?;
    }
    Ok(registry)
}

fn cmd_scan(writer: &OutputWriter, roots: &[PathBuf], options: &ConfigArgs) -> Result<()> {
    let registry = build_registry(roots, options)?;
    let output = ScanOutput::from_registry(&registry);
    writer.write(&output, || output.to_text())
}

fn cmd_serve(roots: &[PathBuf], options: &ConfigArgs, addr: &str) -> Result<()> {
    let registry = build_registry(roots, options)?;
    serve(AssetTube::from_registry(registry), addr)
}

fn cmd_serve_manifest(manifest: &Path, serve_root: &Path, addr: &str) -> Result<()> {
    let registry = Registry::from_manifest(manifest, serve_root)
        .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
    serve(AssetTube::from_registry(registry), addr)
}

/// Answer requests until the process is killed.
fn serve(tube: AssetTube, addr: &str) -> Result<()> {
    let server = tiny_http::Server::http(addr)
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    let server = Arc::new(server);
    let tube = Arc::new(tube);

    let prefix = tube.load().config().url_prefix.clone();
    info!(
        %addr,
        mount = %format!("/{prefix}"),
        assets = tube.load().tables().len(),
        "serving assets"
    );

    let workers: Vec<_> = (0..SERVE_THREADS)
        .map(|_| {
            let server = Arc::clone(&server);
            let tube = Arc::clone(&tube);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    if let Err(e) = tube.serve(request) {
                        warn!("request error: {e}");
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            warn!("serve worker panicked");
        }
    }
    Ok(())
}
