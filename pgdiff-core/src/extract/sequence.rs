//! Last value of every sequence, via a transient lookup function.

use tokio_postgres::Client;

use crate::config::FilterConfig;
use crate::db::{with_helper_routine, HelperRoutine};
use crate::document::{Document, Value};
use crate::error::{PgDiffError, Result};

use super::insert_entry;

const LAST_VALUE_FN: &str = "CREATE FUNCTION {name}(schema_name text, seq_name text)
RETURNS bigint AS $$
DECLARE
    result bigint;
BEGIN
    EXECUTE format('SELECT last_value FROM %I.%I', schema_name, seq_name) INTO result;
    RETURN result;
END;
$$ LANGUAGE plpgsql";

/// Sequence name to last value, ordered by name.
pub async fn load(client: &Client, filters: &FilterConfig) -> Result<Document> {
    let helper = HelperRoutine::new("pgdiff_seq_last_value", "text, text", LAST_VALUE_FN);
    let sql = format!(
        "SELECT n.nspname::text, c.relname::text,
                {}(n.nspname::text, c.relname::text) AS last_value
         FROM pg_class c
         JOIN pg_namespace n ON n.oid = c.relnamespace
         WHERE c.relkind = 'S' AND n.nspname <> ALL($1::text[])
         ORDER BY c.relname, n.nspname",
        helper.ident()
    );

    let sql = sql.as_str();
    let schemas = &filters.ignored_schemas;
    let rows = with_helper_routine(client, &helper, "sequence", move || async move {
        client
            .query(sql, &[schemas])
            .await
            .map_err(|e| PgDiffError::query("load sequences", &e))
    })
    .await?;

    let mut doc = Document::new();
    for row in &rows {
        let schema: String = row.get(0);
        insert_entry(&mut doc, &schema, row.get(1), Value::Integer(row.get(2)));
    }
    log::debug!("Loaded sequences; sequences={}", doc.len());
    Ok(doc)
}
