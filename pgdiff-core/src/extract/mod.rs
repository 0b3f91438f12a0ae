//! Snapshot extractors: one database, one category, one [`Document`].

use tokio_postgres::Client;

use crate::category::Category;
use crate::config::{DescribeConfig, FilterConfig};
use crate::describe::PsqlDescriber;
use crate::document::{Document, Value};
use crate::dsn::ConnectionParams;
use crate::error::Result;
use crate::normalize::Normalizer;

pub mod inventory;
pub mod row_count;
pub mod sequence;
pub mod size;
pub mod structure;

/// Everything an extractor needs besides the connection itself.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub filters: FilterConfig,
    pub describe: DescribeConfig,
    /// Parameters of the database being extracted, for the describe command.
    pub params: ConnectionParams,
}

/// Run the extractor for `category` against one connection.
pub async fn load(client: &Client, category: Category, ctx: &ExtractContext) -> Result<Document> {
    log::debug!(
        "Loading category; category={}, database={}",
        category,
        ctx.params.display_name()
    );
    match category {
        Category::TableName | Category::TableCount => {
            let tables = inventory::list_tables(client, &ctx.filters).await?;
            Ok(inventory::to_document(tables))
        }
        Category::RowCount => row_count::load(client, &ctx.filters).await,
        Category::TableSize | Category::IndexSize | Category::TableTotalSize => {
            size::load(client, category, &ctx.filters).await
        }
        Category::Sequence => sequence::load(client, &ctx.filters).await,
        Category::TableSchema => {
            let describer = PsqlDescriber::new(ctx.describe.psql_path.clone(), ctx.params.clone());
            let normalizer = Normalizer::from_config(&ctx.describe, &ctx.filters);
            structure::load(client, &describer, &normalizer, &ctx.filters).await
        }
    }
}

/// Insert under the bare name. A name already present from another schema
/// is overwritten.
pub(crate) fn insert_entry(doc: &mut Document, schema: &str, name: String, value: Value) {
    if doc.insert(name.clone(), value).is_some() {
        log::warn!(
            "Name exists in more than one schema, keeping the last; name={}, schema={}",
            name,
            schema
        );
    }
}
