pub mod calendar;
pub mod cli;
pub mod config;
pub mod model;
pub mod processor;
pub mod tables;
pub mod writer;

use anyhow::Context;
use clap::Parser;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("compilation failed with {errors} error(s) and {warnings} warning(s)")]
    CompilationFailed { errors: usize, warnings: usize },
    #[error("{0}")]
    InvalidArguments(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub fn run() -> anyhow::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    let args = cli::Cli::parse();
    compile_file(&args)
}

/// Compiles `args.source`, prints the diagnostics report and, when there
/// were no errors, writes the runtime stream and the optional listing.
pub fn compile_file(args: &cli::Cli) -> anyhow::Result<()> {
    // 1. ── Arguments ──────────────────────────────────────────────────
    let config = config::Config::load(args.config.as_deref())?;
    let output = args.output_path(&config);
    args.validate(&output)?;

    // 2. ── Compile ────────────────────────────────────────────────────
    let source = std::fs::read_to_string(&args.source)
        .with_context(|| format!("Reading {}", args.source.display()))?;
    log::info!("compiling {}", args.source.display());
    let compilation = processor::run(&source, &config);

    let diagnostics = &compilation.diagnostics;
    print!("{}", diagnostics.render());
    println!(
        "{} error(s), {} warning(s)",
        diagnostics.error_count(),
        diagnostics.warning_count()
    );

    let Some(project) = compilation.project else {
        return Err(Error::CompilationFailed {
            errors: diagnostics.error_count(),
            warnings: diagnostics.warning_count(),
        }
        .into());
    };

    // 3. ── Write outputs ──────────────────────────────────────────────
    writer::portable::emit(&project, &output).with_context(|| format!("Writing {}", output.display()))?;
    log::info!("wrote {}", output.display());

    if let Some(listing) = &args.listing {
        writer::listing::emit(&project, listing).with_context(|| format!("Writing {}", listing.display()))?;
        log::info!("wrote {}", listing.display());
    }

    Ok(())
}
