//! On-disk sizes per table.

use tokio_postgres::Client;

use crate::category::Category;
use crate::config::FilterConfig;
use crate::document::{Document, Value};
use crate::error::{PgDiffError, Result};

use super::insert_entry;

/// Server function reporting the size for a size category.
fn size_function(category: Category) -> Option<&'static str> {
    match category {
        Category::TableSize => Some("pg_table_size"),
        Category::IndexSize => Some("pg_indexes_size"),
        Category::TableTotalSize => Some("pg_total_relation_size"),
        _ => None,
    }
}

fn size_query(function: &str) -> String {
    format!(
        "SELECT table_schema::text, table_name::text,
                {}(format('%I.%I', table_schema, table_name)::regclass) AS size
         FROM information_schema.tables
         WHERE table_type = 'BASE TABLE' AND table_schema <> ALL($1::text[])
         ORDER BY size DESC, table_name",
        function
    )
}

/// Byte size of every base table for one size category, largest first.
pub async fn load(client: &Client, category: Category, filters: &FilterConfig) -> Result<Document> {
    let function = size_function(category).ok_or_else(|| {
        PgDiffError::ValidationFailed(format!("'{}' is not a size category", category))
    })?;
    let phase = format!("load {}", category.label());

    let rows = client
        .query(size_query(function).as_str(), &[&filters.ignored_schemas])
        .await
        .map_err(|e| PgDiffError::query(phase.as_str(), &e))?;

    let mut doc = Document::new();
    for row in &rows {
        let schema: String = row.get(0);
        insert_entry(&mut doc, &schema, row.get(1), Value::Integer(row.get(2)));
    }
    Ok(doc)
}
