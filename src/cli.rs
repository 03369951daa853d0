// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - serve: run the HTTP service with background cache revalidation
// - check: verify a handful of URLs once, print the result and exit
// =============================================================================

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use link_vigil::ReportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "link-vigil",
    version,
    about = "Verify batches of links, cache their status and report on them later",
    long_about = "link-vigil checks whether URLs answer 200 OK, keeps the answers in a bounded \
                  cache that is re-checked in the background, and records every submitted list \
                  as a numbered batch that can be turned into a report."
)]
pub struct Cli {
    /// Path to a TOML config file (default: ./config/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    ///
    /// Example: link-vigil serve --config config/config.toml
    Serve {
        /// Override the port from the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Check URLs once and print their status
    ///
    /// Example: link-vigil check example.com https://www.rust-lang.org
    /// Example: link-vigil check a.com b.com --format pdf --output report.pdf
    Check {
        /// URLs to check; a missing scheme means http://
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output format: text (table), json or pdf
        #[arg(long, default_value = "text")]
        format: ReportFormat,

        /// Shorthand for --format json
        #[arg(long, conflicts_with = "format")]
        json: bool,

        /// Write the report to this file instead of stdout (required for pdf)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["link-vigil", "check", "a.com", "b.com", "--json"]);
        match cli.command {
            Commands::Check {
                urls,
                format,
                json,
                output,
            } => {
                assert_eq!(urls, vec!["a.com", "b.com"]);
                assert!(json);
                assert_eq!(format, ReportFormat::Text);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_check_pdf_to_file() {
        let cli = Cli::parse_from([
            "link-vigil",
            "check",
            "a.com",
            "--format",
            "pdf",
            "-o",
            "report.pdf",
        ]);
        match cli.command {
            Commands::Check { format, output, .. } => {
                assert_eq!(format, ReportFormat::Pdf);
                assert_eq!(output, Some(PathBuf::from("report.pdf")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let result = Cli::try_parse_from(["link-vigil", "check", "a.com", "--format", "docx"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_serve_with_config() {
        let cli = Cli::parse_from(["link-vigil", "serve", "--config", "x.toml", "--port", "9000"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000) }));
    }

    #[test]
    fn test_check_requires_urls() {
        assert!(Cli::try_parse_from(["link-vigil", "check"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
