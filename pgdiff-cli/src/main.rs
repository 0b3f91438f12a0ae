//! CLI entry point for pg-diff.
//! Parses flags with clap, resolves configuration, runs a diff or an info
//! report, and maps error types to exit codes.

mod output;

use std::process;
use std::str::FromStr;

use clap::Parser;
use colored::Colorize;

use pgdiff_core::config::{CliOverrides, PgDiffConfig};
use pgdiff_core::error::PgDiffError;
use pgdiff_core::{Category, Outcome, PgDiff};

const TYPE_HELP: &str = "Comparison type: table_name, table_count, row_count, table_schema, \
                         table_size, index_size, table_total_size, sequence";

/// Command line for pg-diff.
#[derive(Parser)]
#[command(
    name = "pg-diff",
    about = "Compare two PostgreSQL databases, or report on one of them",
    version
)]
struct Cli {
    /// Comparison type
    #[arg(short = 't', long = "type", value_name = "TYPE", long_help = TYPE_HELP)]
    diff_type: String,

    /// Source database (URL or key=value DSN)
    #[arg(long, value_name = "DSN")]
    source: Option<String>,

    /// Target database; omit to report on the source only
    #[arg(long, value_name = "DSN")]
    target: Option<String>,

    /// Config file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Path to the psql binary used for table_schema
    #[arg(long, value_name = "PATH")]
    psql: Option<String>,

    /// Number of retries when connecting to a database
    #[arg(long, value_name = "N")]
    connect_retries: Option<u32>,

    /// Connection timeout in seconds (default: 30, 0 = no timeout)
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u32>,

    /// Statement timeout in seconds (default: 0 = no limit)
    #[arg(long, value_name = "SECS")]
    statement_timeout: Option<u32>,

    /// Exit with code 10 when differences are found
    #[arg(long)]
    fail_on_diff: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Show full documents and debug output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli).await {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
fn exit_code(error: &PgDiffError) -> i32 {
    match error.root() {
        PgDiffError::ConfigError(_) => 2,
        PgDiffError::ValidationFailed(_) => 3,
        PgDiffError::ConnectionFailed { .. } => 4,
        PgDiffError::DatabaseError(_) => 4,
        PgDiffError::QueryFailed { .. } => 5,
        PgDiffError::DescribeFailed { .. } => 5,
        PgDiffError::DifferencesFound { .. } => 10,
        _ => 1,
    }
}

/// Resolve configuration and run a diff (target given) or an info report.
async fn run(cli: Cli) -> Result<(), PgDiffError> {
    let json_output = cli.json;

    // Reject an unknown type before touching config or the network.
    let category = Category::from_str(&cli.diff_type)?;

    let overrides = CliOverrides {
        source: cli.source,
        target: cli.target,
        psql_path: cli.psql,
        connect_retries: cli.connect_retries,
        connect_timeout: cli.connect_timeout,
        statement_timeout: cli.statement_timeout,
    };
    let config = PgDiffConfig::load(cli.config.as_deref(), &overrides)?;
    log::debug!("Resolved configuration; config={:?}", config);

    let pd = PgDiff::new(config);
    match pd.run(category, cli.verbose).await? {
        Outcome::Diff(report) => {
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?
                );
            } else {
                output::print_diff_report(&report);
            }
            if cli.fail_on_diff && !report.identical {
                return Err(PgDiffError::DifferencesFound {
                    category: category.to_string(),
                    count: report.diff.len(),
                });
            }
        }
        Outcome::Info(report) => {
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?
                );
            } else {
                output::print_info_report(&report);
            }
        }
    }
    Ok(())
}

/// Print a formatted error message with actionable hints to stderr.
fn print_error(error: &PgDiffError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);
    // Provide actionable guidance
    match error.root() {
        PgDiffError::ConfigError(_) => {
            eprintln!(
                "{}",
                "Hint: Pass --source, set PGDIFF_SOURCE, or add `source` to pgdiff.toml.".dimmed()
            );
        }
        PgDiffError::ValidationFailed(_) => {
            eprintln!(
                "{}",
                "Hint: Use a postgres:// URL or a key=value DSN, and one of the types listed in --help."
                    .dimmed()
            );
        }
        PgDiffError::ConnectionFailed { .. } | PgDiffError::DatabaseError(_) => {
            eprintln!(
                "{}",
                "Hint: Verify the database is running and connection details are correct.".dimmed()
            );
        }
        PgDiffError::DescribeFailed { .. } => {
            eprintln!(
                "{}",
                "Hint: table_schema needs psql on PATH, or pass --psql <PATH>.".dimmed()
            );
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_look_through_load_failures() {
        let err = PgDiffError::LoadFailed {
            side: "source".to_string(),
            source: Box::new(PgDiffError::ConnectionFailed {
                endpoint: "app@db:5432/app".to_string(),
                reason: "refused".to_string(),
            }),
        };
        assert_eq!(exit_code(&err), 4);
        assert_eq!(
            exit_code(&PgDiffError::DifferencesFound {
                category: "row_count".to_string(),
                count: 2
            }),
            10
        );
        assert_eq!(exit_code(&PgDiffError::ValidationFailed("x".to_string())), 3);
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "pg-diff",
            "--type=row_count",
            "--source",
            "postgres://a@h/db",
            "--target",
            "postgres://a@h2/db",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.diff_type, "row_count");
        assert!(cli.verbose);
        assert!(!cli.fail_on_diff);
    }
}
