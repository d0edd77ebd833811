//! `reseal` — batch tool entry point.
//!
//! Startup sequence:
//! 1. Parse arguments and load the layered [`Config`](config::Config).
//! 2. Initialise structured JSON logging.
//! 3. Load the key and build the [`EncryptionService`].
//! 4. Open the record store.
//! 5. Run one batch pass over the scope and print the summary.
//!
//! Setup failures print one `ERROR: ...` line to stderr and exit non-zero;
//! per-record failures only show up in the summary's error count.

mod config;
mod store;
mod telemetry;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sealer::{batch, EncryptionService};
use tracing::info;
use zeroize::Zeroize;

use config::{Args, Config};
use store::JsonFileStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Telemetry may not be up yet; write to stderr directly.
            eprintln!("{}", fatal_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn fatal_message(err: &anyhow::Error) -> String {
    format!("ERROR: {err:#}")
}

async fn run() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let mut args = Args::parse();
    let loaded = Config::load(&args).context("configuration invalid");
    args.key.zeroize();
    let cfg = loaded?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        scope = %cfg.scope,
        mode = %cfg.mode(),
        dry_run = cfg.dry_run,
        "reseal starting"
    );

    // -----------------------------------------------------------------------
    // 3. Encryption service
    // -----------------------------------------------------------------------
    let service = {
        let key = cfg.load_key().context("failed to load encryption key")?;
        EncryptionService::new(true, key.as_bytes())
            .context("failed to initialise encryption service")?
    };

    // -----------------------------------------------------------------------
    // 4. Record store
    // -----------------------------------------------------------------------
    let store = JsonFileStore::open(&cfg.store_dir)
        .await
        .with_context(|| format!("failed to open store at {}", cfg.store_dir.display()))?;

    // -----------------------------------------------------------------------
    // 5. Batch run
    // -----------------------------------------------------------------------
    let report = batch::run(&service, &store, &cfg.batch_options())
        .await
        .with_context(|| format!("failed to get records for scope {}", cfg.scope))?;

    print!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_message_is_single_error_line_with_causes() {
        let err = anyhow::anyhow!("scope is required").context("configuration invalid");
        assert_eq!(
            fatal_message(&err),
            "ERROR: configuration invalid: scope is required"
        );
    }
}
