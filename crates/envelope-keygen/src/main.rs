//! Generate an RSA key pair for an envelope server.
//!
//! Prints the PKCS#8 public key followed by the PKCS#1 private key on stdout,
//! or writes `public.pem` / `private.pem` into `--out-dir`. Logs go to stderr.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use envelope_crypto::{generate_key_pair, KeyPair, DEFAULT_KEY_BITS, RECOMMENDED_KEY_BITS};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PUBLIC_FILE: &str = "public.pem";
const PRIVATE_FILE: &str = "private.pem";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Modulus size in bits
    #[arg(env = "ENVELOPE_KEY_BITS", default_value_t = DEFAULT_KEY_BITS)]
    bits: usize,

    /// Write public.pem and private.pem here instead of printing them
    #[arg(long, env = "ENVELOPE_KEY_DIR", value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.bits < RECOMMENDED_KEY_BITS {
        warn!(
            bits = args.bits,
            recommended = RECOMMENDED_KEY_BITS,
            "key size is below the recommended minimum"
        );
    }

    let started = Instant::now();
    let pair = generate_key_pair(args.bits)?;
    info!(
        bits = args.bits,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated key pair"
    );

    match &args.out_dir {
        Some(dir) => {
            write_key_pair(dir, &pair)?;
            info!(dir = %dir.display(), "wrote key pair");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(pair.public_pem.as_bytes())?;
            stdout.write_all(pair.private_pem.as_bytes())?;
        }
    }
    Ok(())
}

fn write_key_pair(dir: &Path, pair: &KeyPair) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(PUBLIC_FILE), &pair.public_pem)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(dir.join(PRIVATE_FILE))?
        .write_all(pair.private_pem.as_bytes())
}
