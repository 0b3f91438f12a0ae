//! Exact row counts, via a transient counting function.

use tokio_postgres::Client;

use crate::config::FilterConfig;
use crate::db::{with_helper_routine, HelperRoutine};
use crate::document::{Document, Value};
use crate::error::{PgDiffError, Result};

use super::insert_entry;

const COUNT_ROWS_FN: &str = "CREATE FUNCTION {name}(schema_name text, rel_name text)
RETURNS bigint AS $$
DECLARE
    result bigint;
BEGIN
    EXECUTE format('SELECT count(*) FROM %I.%I', schema_name, rel_name) INTO result;
    RETURN result;
END;
$$ LANGUAGE plpgsql";

/// Row count of every base table, largest first.
pub async fn load(client: &Client, filters: &FilterConfig) -> Result<Document> {
    let helper = HelperRoutine::new("pgdiff_count_rows", "text, text", COUNT_ROWS_FN);
    let sql = format!(
        "SELECT table_schema::text, table_name::text,
                {}(table_schema::text, table_name::text) AS row_count
         FROM information_schema.tables
         WHERE table_type = 'BASE TABLE' AND table_schema <> ALL($1::text[])
         ORDER BY row_count DESC, table_name",
        helper.ident()
    );

    let sql = sql.as_str();
    let schemas = &filters.ignored_schemas;
    let rows = with_helper_routine(client, &helper, "row-count", move || async move {
        client
            .query(sql, &[schemas])
            .await
            .map_err(|e| PgDiffError::query("load row counts", &e))
    })
    .await?;

    let mut doc = Document::new();
    for row in &rows {
        let schema: String = row.get(0);
        insert_entry(&mut doc, &schema, row.get(1), Value::Integer(row.get(2)));
    }
    log::debug!("Loaded row counts; tables={}", doc.len());
    Ok(doc)
}
