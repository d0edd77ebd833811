//! Command-line arguments and layered configuration for the batch tool.
//!
//! Sources, lowest precedence first:
//! 1. an optional config file (`--config`, TOML/JSON/YAML by extension);
//! 2. `RESEAL_*` environment variables (e.g. `RESEAL_STORE_DIR`);
//! 3. command-line flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use sealer::{BatchOptions, Mode, SecretKey};

/// Encrypt (or, with `--reverse`, decrypt) every stored record in a scope.
#[derive(Debug, Parser)]
#[command(name = "reseal", version)]
pub struct Args {
    /// Scope (topic) whose records are processed.
    #[arg(long)]
    pub scope: Option<String>,

    /// Decrypt encrypted records instead of encrypting plaintext ones.
    #[arg(long)]
    pub reverse: bool,

    /// Show what would be done without saving any record.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to a file containing the base64-encoded 32-byte key.
    #[arg(long, conflicts_with = "key")]
    pub key_file: Option<PathBuf>,

    /// Base64-encoded 32-byte key.
    #[arg(long)]
    pub key: Option<String>,

    /// Directory holding one `<scope>.json` file per scope.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Optional configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tracing log level (e.g. `info`, `debug`).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Inline base64 key text, wiped when dropped.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct InlineKey(String);

impl InlineKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for InlineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InlineKey([REDACTED])")
    }
}

/// Validated batch tool configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Scope to process. **Required.**
    #[serde(default)]
    pub scope: String,

    /// Decrypt instead of encrypt.
    #[serde(default)]
    pub reverse: bool,

    #[serde(default)]
    pub dry_run: bool,

    /// Key file path. Exactly one of `key_file` and `key` is required.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Inline base64 key.
    #[serde(default)]
    pub key: Option<InlineKey>,

    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("records")
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Merge the config file, environment and `args`, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the merged result is
    /// invalid (missing scope, no key or two keys).
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        builder = builder
            .add_source(config::Environment::with_prefix("RESEAL"))
            .set_override_option("scope", args.scope.clone())?
            .set_override_option("key", args.key.clone())?
            .set_override_option(
                "key_file",
                args.key_file.as_ref().map(|p| p.display().to_string()),
            )?
            .set_override_option(
                "store_dir",
                args.store_dir.as_ref().map(|p| p.display().to_string()),
            )?
            .set_override_option("log_level", args.log_level.clone())?;
        if args.reverse {
            builder = builder.set_override("reverse", true)?;
        }
        if args.dry_run {
            builder = builder.set_override("dry_run", true)?;
        }

        let c: Config = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.scope, "scope (--scope or RESEAL_SCOPE)")?;
        match (&self.key_file, &self.key) {
            (Some(_), Some(_)) => anyhow::bail!("specify only one of --key-file or --key"),
            (None, None) => anyhow::bail!("either --key-file or --key must be specified"),
            (None, Some(key)) => ensure_non_empty(key.expose(), "key")?,
            (Some(_), None) => {}
        }
        if self.store_dir.as_os_str().is_empty() {
            anyhow::bail!("store_dir must not be empty");
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        if self.reverse {
            Mode::Decrypt
        } else {
            Mode::Encrypt
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            scope: self.scope.clone(),
            mode: self.mode(),
            dry_run: self.dry_run,
        }
    }

    /// Read and decode the configured key material.
    pub fn load_key(&self) -> Result<SecretKey> {
        let key = match (&self.key_file, &self.key) {
            (Some(path), _) => SecretKey::from_file(path)?,
            (None, Some(encoded)) => SecretKey::from_base64(encoded.expose())?,
            (None, None) => anyhow::bail!("no key material configured"),
        };
        Ok(key)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("scope", &self.scope)
            .field("reverse", &self.reverse)
            .field("dry_run", &self.dry_run)
            .field("key_file", &self.key_file)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("store_dir", &self.store_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
