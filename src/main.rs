// src/main.rs
// =============================================================================
// Entry point of the link-vigil binary.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Load the config file and set up logging
// 3. Dispatch to the subcommand (serve / check; check renders text, json
//    or pdf to stdout or a file)
// 4. Exit with proper code (0 = all available, 1 = some not available,
//    2 = error)
// =============================================================================

mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use link_vigil::{server, telemetry, Config, ReportFormat, Verification, VerificationEngine};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    telemetry::init_tracing(&config.log).context("failed to set up logging")?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
                config.validate()?;
            }
            server::run(config).await?;
            Ok(0)
        }
        Commands::Check {
            urls,
            format,
            json,
            output,
        } => {
            let format = if json { ReportFormat::Json } else { format };
            handle_check(&config, &urls, format, output.as_deref()).await
        }
    }
}

// Handles the 'check' subcommand: one verify call, rendered, then exit
async fn handle_check(
    config: &Config,
    urls: &[String],
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<i32> {
    if format == ReportFormat::Pdf && output.is_none() {
        bail!("--format pdf needs --output <FILE>");
    }

    let engine = VerificationEngine::from_config(config)?;

    if format == ReportFormat::Text && output.is_none() {
        println!("🔍 Checking {} link(s)...\n", urls.len());
    }

    let verification = engine.verify(urls).await?;
    write_results(&verification, format, output)?;

    let not_available = verification
        .links
        .values()
        .filter(|status| !status.is_available())
        .count();

    if not_available > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Renders the results with the chosen format to stdout or a file
fn write_results(
    verification: &Verification,
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = format.renderer().render(&verification.links)?;

    match output {
        Some(path) => {
            fs::write(path, &bytes)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            if format == ReportFormat::Json {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}
