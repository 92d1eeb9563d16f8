//! Command line front end.
//!
//! ```bash
//! # Check one or more overlays, merged in order
//! domain-overlay validate base.yaml board.yaml
//!
//! # Resolve and write canonical JSON
//! domain-overlay resolve base.yaml board.yaml -o resolved.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use domain_overlay::{emit, OverlayCompiler, OverlayError, ResolverConfig, ValidationReport};

#[derive(Parser)]
#[command(name = "domain-overlay")]
#[command(version)]
#[command(about = "Resolve and validate AMP domain overlays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Resolver configuration (.toml, .yaml or .json)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline stages (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and check overlays, printing every diagnostic
    Validate {
        /// Overlay files, merged in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Resolve overlays and emit canonical JSON
    Resolve {
        /// Overlay files, merged in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (stdout if not provided)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,

        /// Attach non-fatal diagnostics to the output
        #[arg(long)]
        diagnostics: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ResolverConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ResolverConfig::default(),
    };

    match cli.command {
        Commands::Validate { files, strict } => {
            config.warnings_as_errors |= strict;
            let sources = OverlayCompiler::load(&files)?;
            let report = OverlayCompiler::new(config).check(&sources);
            print_report(&report);
            println!(
                "{}: {} error(s), {} warning(s)",
                if report.is_valid { "valid" } else { "invalid" },
                report.errors().len(),
                report.warnings().len()
            );
            Ok(exit_code(report.is_valid))
        }
        Commands::Resolve {
            files,
            output,
            compact,
            diagnostics,
        } => {
            config.emit.pretty &= !compact;
            config.emit.include_diagnostics |= diagnostics;
            let compiler = OverlayCompiler::new(config);
            let resolved = match compiler.compile_files(&files) {
                Ok(resolved) => resolved,
                Err(OverlayError::ValidationFailed(report)) => {
                    print_report(&report);
                    return Ok(exit_code(false));
                }
                Err(err) => return Err(err.into()),
            };
            print_report(&resolved.report);

            let json = emit(&resolved, &compiler.config().emit)?;
            match output {
                Some(path) => std::fs::write(&path, json + "\n")
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(report: &ValidationReport) {
    for diag in &report.diagnostics {
        match &diag.domain {
            Some(domain) => eprintln!("{} [{}]", diag, domain),
            None => eprintln!("{}", diag),
        }
    }
}

fn exit_code(valid: bool) -> ExitCode {
    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
