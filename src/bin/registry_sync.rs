//! Run one registry pass over a stream of type-visit events.
//!
//! Usage:
//!   registry-sync --class-output target/classes < visits.ndjson
//!   registry-sync --output-dir build/generated --events visits.json
//!
//! Prints the pass report as JSON on stdout. Persistence problems end up in
//! the report's diagnostics; only bad input or configuration exits non-zero.

use anyhow::{Context, Result};
use clap::Parser;
use provider_registry::{BuildPass, DescriptorKindName, HostOutput, Options, parse_visit_stream};
use std::fs;
use std::io::{Read, stdin};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "registry-sync")]
#[command(about = "Reconcile provider-registry descriptors with a build pass")]
struct Cli {
    /// Optional JSON options file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Explicit output root for descriptors.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// The build tool's class-output directory, used to resolve the locator.
    #[arg(long)]
    class_output: Option<PathBuf>,
    /// Descriptor kind to maintain.
    #[arg(long, value_parser = ["services", "sisu"])]
    kind: Option<String>,
    /// Skip all processing.
    #[arg(long)]
    disabled: bool,
    /// Do not write registry.log.
    #[arg(long)]
    no_log: bool,
    /// Events file; reads stdin when omitted.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = resolve_options(&cli)?;
    let input = read_input(cli.events.as_ref())?;
    let visits = parse_visit_stream(&input)?;

    let host = HostOutput::new(cli.class_output.clone());
    let mut pass = BuildPass::begin(&options, &host);
    for visit in &visits {
        pass.visit(visit);
    }
    let report = pass.finish();

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_options(cli: &Cli) -> Result<Options> {
    let mut options = match &cli.config {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if let Some(dir) = &cli.output_dir {
        options.output_directory = Some(dir.clone());
    }
    if let Some(kind) = &cli.kind {
        options.kind = DescriptorKindName::try_from(kind.as_str()).map_err(anyhow::Error::msg)?;
    }
    if cli.disabled {
        options.disabled = true;
    }
    if cli.no_log {
        options.log = false;
    }
    Ok(options)
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    let mut buf = String::new();
    if let Some(path) = path {
        buf = fs::read_to_string(path)
            .with_context(|| format!("reading events file {}", path.display()))?;
    } else {
        stdin()
            .read_to_string(&mut buf)
            .context("reading stdin for type visits")?;
    }
    Ok(buf)
}
