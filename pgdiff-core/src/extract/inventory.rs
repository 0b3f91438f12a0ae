//! Base table inventory.

use tokio_postgres::Client;

use crate::config::FilterConfig;
use crate::document::{Document, Value};
use crate::error::{PgDiffError, Result};

use super::insert_entry;

/// A base table and the schema that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

const LIST_TABLES_SQL: &str = "SELECT table_schema::text, table_name::text
     FROM information_schema.tables
     WHERE table_type = 'BASE TABLE' AND table_schema <> ALL($1::text[])
     ORDER BY table_name, table_schema";

/// All base tables outside the ignored schemas, ordered by name.
pub async fn list_tables(client: &Client, filters: &FilterConfig) -> Result<Vec<TableRef>> {
    let rows = client
        .query(LIST_TABLES_SQL, &[&filters.ignored_schemas])
        .await
        .map_err(|e| PgDiffError::query("list tables", &e))?;

    Ok(rows
        .iter()
        .map(|row| TableRef {
            schema: row.get(0),
            name: row.get(1),
        })
        .collect())
}

/// Table name to owning schema.
pub fn to_document(tables: Vec<TableRef>) -> Document {
    let mut doc = Document::new();
    for t in tables {
        insert_entry(&mut doc, &t.schema, t.name, Value::Text(t.schema.clone()));
    }
    doc
}
