// crates/tr_cli/src/args.rs

//! Argument surface for the `trsim` binary.
//!
//! clap owns the flag-level rules (conflicts, value sets); [`validate`] adds
//! the combination rule clap cannot express (a manifest XOR both explicit
//! paths) plus the offline path policy. Whether a named file actually exists
//! is left to the loader, so a missing input surfaces as an I/O failure, not
//! a usage error.

use std::path::PathBuf;

use clap::Parser;

use tr_io::hasher::normalize_rfc3339_utc_seconds;
use tr_io::looks_like_url;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "trsim",
    disable_help_subcommand = true,
    about = "Offline, deterministic runner for the tax-reform transition simulator"
)]
pub struct Args {
    // --- Mode selection ---
    /// Run manifest JSON naming both inputs (mutually exclusive with explicit file flags).
    #[arg(long, conflicts_with_all = ["request", "engine_result"])]
    pub manifest: Option<PathBuf>,

    // --- Explicit mode (when --manifest is not used) ---
    /// SimulationRequest JSON path.
    #[arg(long)]
    pub request: Option<PathBuf>,
    /// Engine result JSON path.
    #[arg(long)]
    pub engine_result: Option<PathBuf>,

    // --- Output & rendering ---
    /// Output directory for run artifacts (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
    /// Renderer(s) to emit. Choose up to 2 (json, html). Omit to skip reports.
    #[arg(long, value_parser = ["json", "html"], num_args = 0..=2)]
    pub render: Vec<String>,

    // --- Determinism & control ---
    /// Pin the recorded run instant (RFC3339 UTC, normalized to whole seconds).
    #[arg(long, value_parser = parse_timestamp)]
    pub timestamp: Option<String>,

    /// Load and validate inputs, then stop without writing anything.
    #[arg(long)]
    pub validate_only: bool,

    /// Suppress non-error diagnostics.
    #[arg(long)]
    pub quiet: bool,
}

/// Errors from the combination checks.
/// Messages stay short and stable (scripts match on them).
#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Combination and offline-policy checks over already-parsed flags.
pub fn validate(args: &Args) -> Result<(), CliError> {
    if args.manifest.is_none() {
        if args.request.is_none() {
            return Err(CliError::Missing("--request (or --manifest)"));
        }
        if args.engine_result.is_none() {
            return Err(CliError::Missing("--engine-result (or --manifest)"));
        }
    }
    for path in [&args.manifest, &args.request, &args.engine_result]
        .into_iter()
        .flatten()
    {
        let text = path.to_string_lossy();
        if looks_like_url(&text) {
            return Err(CliError::NonLocalPath(text.into_owned()));
        }
    }
    Ok(())
}

/// clap value parser: UTC instants only. `+00:00` offsets and fractional
/// seconds normalize to the plain `Z` second form; non-UTC offsets are
/// rejected, so a pinned run id reads the same on every host.
fn parse_timestamp(s: &str) -> Result<String, String> {
    normalize_rfc3339_utc_seconds(s).map_err(|e| e.to_string())
}
