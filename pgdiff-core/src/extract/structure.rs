//! Normalized `\d` description of every base table.

use tokio_postgres::Client;

use crate::config::FilterConfig;
use crate::describe::DescribeTable;
use crate::document::{Document, Value};
use crate::error::Result;
use crate::normalize::Normalizer;

use super::insert_entry;
use super::inventory::{list_tables, TableRef};

/// List tables, then describe and normalize each in turn.
pub async fn load<D: DescribeTable>(
    client: &Client,
    describer: &D,
    normalizer: &Normalizer,
    filters: &FilterConfig,
) -> Result<Document> {
    let tables = list_tables(client, filters).await?;
    describe_tables(&tables, describer, normalizer).await
}

/// Describe `tables` one at a time. The first failure aborts.
pub async fn describe_tables<D: DescribeTable>(
    tables: &[TableRef],
    describer: &D,
    normalizer: &Normalizer,
) -> Result<Document> {
    let mut doc = Document::new();
    for table in tables {
        let raw = describer.describe(&table.schema, &table.name).await?;
        let schema_doc = normalizer.normalize(&raw);
        insert_entry(
            &mut doc,
            &table.schema,
            table.name.clone(),
            Value::Structure(schema_doc),
        );
    }
    log::debug!("Described tables; tables={}", doc.len());
    Ok(doc)
}
