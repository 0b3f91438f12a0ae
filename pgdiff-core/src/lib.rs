//! Compare two PostgreSQL databases, or summarize one, by category.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pgdiff_core::config::{CliOverrides, PgDiffConfig};
//! use pgdiff_core::{Category, PgDiff};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PgDiffConfig::load(None, &CliOverrides::default())?;
//! let pd = PgDiff::new(config);
//! let report = pd.diff(Category::RowCount, false).await?;
//! println!("Identical: {}", report.identical);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`category`]: The fixed set of comparison categories
//! - [`config`]: Configuration loading (TOML, env vars, CLI overrides)
//! - [`dsn`]: Connection string parsing (URL and key=value forms)
//! - [`db`]: Database connections, TLS, transient helper routines
//! - [`extract`]: Per-category snapshot extractors
//! - [`describe`]: `psql \d` invocation
//! - [`normalize`]: Describe-text to schema document parser
//! - [`document`]: Snapshot documents and values
//! - [`diff`]: Structural document diff
//! - [`commands`]: Diff and info commands
//! - [`error`]: Error types

pub mod category;
pub mod commands;
pub mod config;
pub mod db;
pub mod describe;
pub mod diff;
pub mod document;
pub mod dsn;
pub mod error;
pub mod extract;
pub mod normalize;

use config::PgDiffConfig;
use error::Result;

pub use category::Category;
pub use commands::diff::DiffReport;
pub use commands::info::InfoReport;
pub use commands::Outcome;
pub use config::CliOverrides;
pub use diff::DocumentDiff;
pub use document::{Document, SchemaDocument, Value};
pub use error::PgDiffError;

/// Main entry point for the pg-diff library.
///
/// Unlike a long-lived client, every command opens its own connections
/// (one per side) and closes them when it returns.
pub struct PgDiff {
    pub config: PgDiffConfig,
}

impl PgDiff {
    pub fn new(config: PgDiffConfig) -> Self {
        Self { config }
    }

    /// Compare the source and target databases for one category.
    pub async fn diff(&self, category: Category, verbose: bool) -> Result<DiffReport> {
        commands::diff::execute(&self.config, category, verbose).await
    }

    /// Summarize one category for the source database.
    pub async fn info(&self, category: Category, verbose: bool) -> Result<InfoReport> {
        commands::info::execute(&self.config, category, verbose).await
    }

    /// Diff when a target is configured, info otherwise.
    pub async fn run(&self, category: Category, verbose: bool) -> Result<Outcome> {
        commands::compare_or_report(&self.config, category, verbose).await
    }
}
