//! Summarize one category for a single database.

use serde::Serialize;

use crate::category::Category;
use crate::config::PgDiffConfig;
use crate::document::Document;
use crate::error::Result;

use super::load_database;

/// Report produced by the info command.
#[derive(Debug, Serialize)]
pub struct InfoReport {
    /// Category that was loaded.
    pub category: Category,
    /// Database, as `user@host:port/db`.
    pub database: String,
    /// Number of tables or sequences.
    pub entries: usize,
    /// Sum of values, table count for inventory categories, none for schemas.
    pub total: Option<i64>,
    /// The full document, in verbose mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Document>,
}

/// Execute the info command.
pub async fn execute(config: &PgDiffConfig, category: Category, verbose: bool) -> Result<InfoReport> {
    let params = config.source_params()?;
    let doc = load_database(config, &params, category).await?;
    Ok(summarize(category, params.display_name(), doc, verbose))
}

/// Build the report for an already loaded document.
pub fn summarize(category: Category, database: String, doc: Document, verbose: bool) -> InfoReport {
    let total = if category.is_inventory() {
        Some(doc.len() as i64)
    } else if category.has_total() {
        Some(doc.total())
    } else {
        None
    };

    InfoReport {
        category,
        database,
        entries: doc.len(),
        total,
        documents: verbose.then_some(doc),
    }
}
