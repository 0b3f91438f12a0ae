//! Comparison engine tests over in-memory loaders (no database needed).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pgdiff_core::commands::diff::compare_loaded;
use pgdiff_core::diff::{diff_documents, ValueChange};
use pgdiff_core::normalize::Normalizer;
use pgdiff_core::{Document, PgDiffError, Value};

fn counts(pairs: &[(&str, i64)]) -> Document {
    pairs
        .iter()
        .map(|(k, v)| (*k, Value::Integer(*v)))
        .collect()
}

async fn slow_load(doc: Document, delay_ms: u64) -> Result<Document, PgDiffError> {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    Ok(doc)
}

#[tokio::test]
async fn test_row_count_scenario() {
    let source = counts(&[("users", 10), ("orders", 5)]);
    let target = counts(&[("users", 10), ("orders", 6), ("audit", 0)]);

    let result = compare_loaded(slow_load(source, 5), slow_load(target, 0))
        .await
        .unwrap();

    assert!(result.diff.removed.is_empty());
    assert_eq!(result.diff.added.len(), 1);
    assert_eq!(result.diff.added[0].key, "audit");
    assert_eq!(result.diff.changed.len(), 1);
    assert_eq!(result.diff.changed[0].key, "orders");
    assert_eq!(result.diff.changed[0].change.delta(), Some(1));
    assert!(result.diff.changed.iter().all(|c| c.key != "users"));
}

#[tokio::test]
async fn test_concurrent_matches_sequential() {
    let source = counts(&[("a", 1), ("b", 2), ("c", 3)]);
    let target = counts(&[("c", 30), ("b", 2), ("d", 4)]);

    let concurrent = compare_loaded(slow_load(source.clone(), 10), slow_load(target.clone(), 1))
        .await
        .unwrap();

    let seq_source = slow_load(source, 0).await.unwrap();
    let seq_target = slow_load(target, 0).await.unwrap();
    let sequential = diff_documents(&seq_source, &seq_target);

    assert_eq!(concurrent.source, seq_source);
    assert_eq!(concurrent.target, seq_target);
    assert_eq!(concurrent.diff, sequential);
}

#[tokio::test]
async fn test_source_failure_discards_target() {
    let err = compare_loaded(
        async {
            Err(PgDiffError::ConnectionFailed {
                endpoint: "app@db1:5432/app".to_string(),
                reason: "connection refused".to_string(),
            })
        },
        slow_load(counts(&[("users", 1)]), 1),
    )
    .await
    .unwrap_err();

    match err {
        PgDiffError::LoadFailed { side, source } => {
            assert_eq!(side, "source");
            assert!(matches!(*source, PgDiffError::ConnectionFailed { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_failing_side_waits_for_other_side_to_finish() {
    let target_finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&target_finished);

    let err = compare_loaded(
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err(PgDiffError::QueryFailed {
                phase: "row count".to_string(),
                reason: "relation does not exist".to_string(),
            })
        },
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Stands in for the target dropping its helper routine.
            flag.store(true, Ordering::SeqCst);
            Ok(counts(&[("users", 1)]))
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PgDiffError::LoadFailed { ref side, .. } if side == "source"));
    assert!(target_finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_both_sides_failing_reports_source() {
    let fail = |endpoint: &str| {
        let endpoint = endpoint.to_string();
        async move {
            Err::<Document, _>(PgDiffError::ConnectionFailed {
                endpoint,
                reason: "connection refused".to_string(),
            })
        }
    };
    let err = compare_loaded(fail("db1"), fail("db2")).await.unwrap_err();
    match err {
        PgDiffError::LoadFailed { side, .. } => assert_eq!(side, "source"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_swapped_columns_produce_empty_schema_diff() {
    let normalizer = Normalizer::default();
    let a = "Table \"public.users\"\n Column | Type | Collation | Nullable | Default\n--------+------+-----------+----------+--------\n id | integer | | not null |\n email | text | | |\nIndexes:\n    \"users_pkey\" PRIMARY KEY, btree (id)\n";
    let b = "Table \"public.users\"\n Column | Type | Collation | Nullable | Default\n--------+------+-----------+----------+--------\n email | text | | |\n id | integer | | not null |\nIndexes:\n    \"users_pkey\" PRIMARY KEY, btree (id)\n";

    let source: Document = vec![("users", Value::Structure(normalizer.normalize(a)))]
        .into_iter()
        .collect();
    let target: Document = vec![("users", Value::Structure(normalizer.normalize(b)))]
        .into_iter()
        .collect();

    let result = compare_loaded(async { Ok(source) }, async { Ok(target) })
        .await
        .unwrap();
    assert!(result.diff.is_empty());
}

#[tokio::test]
async fn test_schema_change_reports_section_lines() {
    let normalizer = Normalizer::default();
    let a = "id | integer\nIndexes:\n    \"t_pkey\" PRIMARY KEY, btree (id)\n";
    let b = "id | bigint\nIndexes:\n    \"t_pkey\" PRIMARY KEY, btree (id)\nTriggers:\n    t_touch BEFORE UPDATE ON t\n";

    let source: Document = vec![("t", Value::Structure(normalizer.normalize(a)))]
        .into_iter()
        .collect();
    let target: Document = vec![("t", Value::Structure(normalizer.normalize(b)))]
        .into_iter()
        .collect();

    let result = compare_loaded(async { Ok(source) }, async { Ok(target) })
        .await
        .unwrap();
    assert_eq!(result.diff.changed.len(), 1);
    match &result.diff.changed[0].change {
        ValueChange::Structure(d) => {
            assert_eq!(d.sections_added, vec!["Triggers"]);
            assert_eq!(d.sections_changed.len(), 1);
            assert_eq!(d.sections_changed[0].name, "Columns");
            assert_eq!(d.sections_changed[0].removed, vec!["id | integer"]);
            assert_eq!(d.sections_changed[0].added, vec!["id | bigint"]);
        }
        other => panic!("unexpected change: {:?}", other),
    }
}
