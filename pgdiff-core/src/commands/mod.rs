//! Command implementations: diff (two databases) and info (one database).

pub mod diff;
pub mod info;

use serde::Serialize;

use crate::category::Category;
use crate::config::PgDiffConfig;
use crate::db;
use crate::document::Document;
use crate::dsn::ConnectionParams;
use crate::error::Result;
use crate::extract::{self, ExtractContext};

pub use diff::DiffReport;
pub use info::InfoReport;

/// Result of [`compare_or_report`].
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Outcome {
    Diff(DiffReport),
    Info(InfoReport),
}

/// Diff source against target when a target is configured, otherwise
/// summarize the source alone.
pub async fn compare_or_report(
    config: &PgDiffConfig,
    category: Category,
    verbose: bool,
) -> Result<Outcome> {
    if config.target.is_some() {
        diff::execute(config, category, verbose).await.map(Outcome::Diff)
    } else {
        info::execute(config, category, verbose).await.map(Outcome::Info)
    }
}

/// Open a dedicated connection to one database and extract one category.
pub(crate) async fn load_database(
    config: &PgDiffConfig,
    params: &ConnectionParams,
    category: Category,
) -> Result<Document> {
    let client = db::connect(params, &config.connection).await?;
    let ctx = ExtractContext {
        filters: config.filters.clone(),
        describe: config.describe.clone(),
        params: params.clone(),
    };
    let doc = extract::load(&client, category, &ctx).await?;
    log::info!(
        "Loaded snapshot; database={}, category={}, entries={}",
        params.display_name(),
        category,
        doc.len()
    );
    Ok(doc)
}
