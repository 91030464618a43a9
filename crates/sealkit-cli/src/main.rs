//! Sealkit command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Show which backend this machine selects
//! sealkit probe
//!
//! # Generate a key, then seal and open with it
//! KEY=$(sealkit keygen)
//! BOX=$(sealkit seal --key "$KEY" --aad order-42 "card token")
//! sealkit open --key "$KEY" --aad order-42 "$BOX"
//!
//! # Force the portable backend and watch the probe
//! RUST_LOG=debug sealkit --backend portable probe
//! ```

mod commands;
mod error;

use clap::{Parser, Subcommand, ValueEnum};
use sealkit_crypto::{Algorithm, BackendKind, CryptoProvider, ProviderConfig, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealkit secret box tool
#[derive(Parser, Debug)]
#[command(name = "sealkit")]
#[command(about = "Seal and open authenticated secret boxes")]
#[command(version)]
struct Args {
    /// AEAD algorithm
    #[arg(long, global = true, value_enum, default_value_t = AlgorithmArg::XChaCha20Poly1305)]
    algorithm: AlgorithmArg,

    /// Allowed backend (repeatable; default: all, accelerated first)
    #[arg(long, global = true, value_enum)]
    backend: Vec<BackendArg>,

    /// Number of recent nonces checked for reuse (at most 4096)
    #[arg(long, global = true, default_value = "64")]
    nonce_reuse_window: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn provider_config(&self) -> ProviderConfig {
        let backends = if self.backend.is_empty() {
            BackendKind::PRIORITY.to_vec()
        } else {
            self.backend.iter().copied().map(BackendKind::from).collect()
        };

        ProviderConfig {
            algorithm: self.algorithm.into(),
            backends,
            nonce_reuse_window: self.nonce_reuse_window,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe backends and report the selection
    Probe,

    /// Generate a random key, printed as hex
    Keygen,

    /// Seal a UTF-8 message; prints `nonce ‖ ciphertext ‖ tag` as hex
    Seal {
        /// Key as hex
        #[arg(long)]
        key: String,
        /// Associated data bound to the box (not encrypted)
        #[arg(long)]
        aad: Option<String>,
        /// Message to seal
        message: String,
    },

    /// Open a hex-encoded box; prints the plaintext
    Open {
        /// Key as hex
        #[arg(long)]
        key: String,
        /// Associated data the box was sealed with
        #[arg(long)]
        aad: Option<String>,
        /// Sealed box as hex
        sealed: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    #[value(name = "xchacha20-poly1305")]
    XChaCha20Poly1305,
    #[value(name = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::XChaCha20Poly1305 => Self::XChaCha20Poly1305,
            AlgorithmArg::ChaCha20Poly1305 => Self::ChaCha20Poly1305,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Accelerated,
    Portable,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Accelerated => Self::Accelerated,
            BackendArg::Portable => Self::Portable,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so stdout carries only keys, boxes and plaintext
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = args.provider_config();
    tracing::debug!(?config, "starting");

    let provider = CryptoProvider::new(SystemEnv::new(), config);
    commands::run(&args.command, &provider, &mut std::io::stdout().lock())?;

    Ok(())
}
