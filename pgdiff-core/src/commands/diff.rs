//! Compare one category between a source and a target database.
//!
//! Both sides are loaded concurrently over their own connections. Either
//! side failing aborts the comparison, but only after the other side has
//! finished, so each side's helper routines are dropped before the error
//! is returned.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::category::Category;
use crate::config::PgDiffConfig;
use crate::diff::{diff_documents, DocumentDiff};
use crate::document::Document;
use crate::error::{PgDiffError, Result};

use super::load_database;

/// Report produced by the diff command.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    /// Category that was compared.
    pub category: Category,
    /// Source database, as `user@host:port/db`.
    pub source: String,
    /// Target database, as `user@host:port/db`.
    pub target: String,
    /// Key-level differences.
    pub diff: DocumentDiff,
    /// Whether the two databases are identical for this category.
    pub identical: bool,
    /// Number of entries loaded from the source.
    pub source_entries: usize,
    /// Number of entries loaded from the target.
    pub target_entries: usize,
    /// When the comparison finished.
    pub compared_at: DateTime<Utc>,
    /// Both full documents, in verbose mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<SideDocuments>,
}

/// The two loaded documents of a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct SideDocuments {
    pub source: Document,
    pub target: Document,
}

/// Both documents and their diff.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub source: Document,
    pub target: Document,
    pub diff: DocumentDiff,
}

/// Await both loads together, then diff.
///
/// Both futures always run to completion. A failing side is reported as
/// `LoadFailed` naming that side; the source wins when both fail.
pub async fn compare_loaded<S, T>(source: S, target: T) -> Result<Comparison>
where
    S: Future<Output = Result<Document>>,
    T: Future<Output = Result<Document>>,
{
    let (source, target) = tokio::join!(source, target);
    let source = source.map_err(|e| load_failed("source", e))?;
    let target = target.map_err(|e| load_failed("target", e))?;
    let diff = diff_documents(&source, &target);
    Ok(Comparison {
        source,
        target,
        diff,
    })
}

fn load_failed(side: &str, e: PgDiffError) -> PgDiffError {
    PgDiffError::LoadFailed {
        side: side.to_string(),
        source: Box::new(e),
    }
}

/// Execute the diff command.
///
/// Both connection strings are validated before any connection is made.
pub async fn execute(config: &PgDiffConfig, category: Category, verbose: bool) -> Result<DiffReport> {
    let source_params = config.source_params()?;
    let target_params = config.target_params()?.ok_or_else(|| {
        PgDiffError::ConfigError("A target database is required for a diff".to_string())
    })?;

    log::info!(
        "Comparing databases; category={}, source={}, target={}",
        category,
        source_params.display_name(),
        target_params.display_name()
    );

    let comparison = compare_loaded(
        load_database(config, &source_params, category),
        load_database(config, &target_params, category),
    )
    .await?;

    let identical = comparison.diff.is_empty();
    log::info!(
        "Comparison finished; category={}, identical={}, differences={}",
        category,
        identical,
        comparison.diff.len()
    );

    Ok(DiffReport {
        category,
        source: source_params.display_name(),
        target: target_params.display_name(),
        identical,
        source_entries: comparison.source.len(),
        target_entries: comparison.target.len(),
        compared_at: Utc::now(),
        diff: comparison.diff,
        documents: verbose.then_some(SideDocuments {
            source: comparison.source,
            target: comparison.target,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PgDiffConfig;
    use crate::document::Value;

    fn doc(pairs: &[(&str, i64)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (*k, Value::Integer(*v)))
            .collect()
    }

    #[tokio::test]
    async fn test_compare_loaded_diffs_both_sides() {
        let result = compare_loaded(
            async { Ok(doc(&[("users", 10), ("orders", 5)])) },
            async { Ok(doc(&[("users", 10), ("orders", 6), ("audit", 0)])) },
        )
        .await
        .unwrap();
        assert_eq!(result.diff.len(), 2);
        assert_eq!(result.source.len(), 2);
        assert_eq!(result.target.len(), 3);
    }

    #[tokio::test]
    async fn test_compare_loaded_names_failing_side() {
        let err = compare_loaded(
            async { Ok(doc(&[("users", 1)])) },
            async {
                Err(PgDiffError::QueryFailed {
                    phase: "load row counts".to_string(),
                    reason: "permission denied".to_string(),
                })
            },
        )
        .await
        .unwrap_err();

        match err {
            PgDiffError::LoadFailed { ref side, .. } => assert_eq!(side, "target"),
            ref other => panic!("unexpected error: {}", other),
        }
        assert!(matches!(err.root(), PgDiffError::QueryFailed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_target_rejected_before_connecting() {
        let config = PgDiffConfig {
            source: Some("postgres://app@127.0.0.1:1/app".to_string()),
            target: Some("mysql://app@127.0.0.1/app".to_string()),
            ..PgDiffConfig::default()
        };
        let err = execute(&config, Category::RowCount, false).await.unwrap_err();
        assert!(matches!(err, PgDiffError::ValidationFailed(_)));
    }
}
